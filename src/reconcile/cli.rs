//! Command line interface for `variants reconcile`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use thousands::Separable;

use crate::common::GenomeRelease;
use crate::conf::Conf;
use crate::reconcile::{ds::SourceStats, reconcile};
use crate::sink::{FileSink, OutputFormat, VariantSink};
use crate::sources::{aou, gnomad, sge, HttpTransport};

/// Command line arguments for `variants reconcile` sub command.
#[derive(Parser, Debug)]
#[command(
    about = "Reconcile gnomAD, All of Us, and SGE variants of one gene",
    long_about = None
)]
pub struct Args {
    /// Path to the SGE table (TSV, optionally gzip-compressed).
    #[arg(long)]
    pub path_sge: PathBuf,
    /// Path to the output file; existing records are upserted by identifier.
    #[arg(long)]
    pub path_output: PathBuf,
    /// Format of the output file.
    #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub output_format: OutputFormat,
    /// Optional path to the TOML configuration with gene and source settings.
    #[arg(long)]
    pub path_conf: Option<PathBuf>,
    /// Override the genome release used for the gnomAD query.
    #[arg(long, value_enum)]
    pub genome_release: Option<GenomeRelease>,
    /// Override the number of rows per All of Us page.
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Do not query gnomAD.
    #[arg(long, default_value_t = false)]
    pub skip_gnomad: bool,
    /// Do not query All of Us.
    #[arg(long, default_value_t = false)]
    pub skip_aou: bool,
}

/// Build the effective configuration from the file and the overrides.
fn load_conf(args: &Args) -> Result<Conf, anyhow::Error> {
    let mut conf = match &args.path_conf {
        Some(path_conf) => {
            tracing::info!("Loading configuration from {:?}", path_conf);
            Conf::load(path_conf)?
        }
        None => Conf::default(),
    };
    if let Some(genome_release) = args.genome_release {
        conf.sources.genome_release = genome_release;
    }
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            anyhow::bail!("--page-size must be positive");
        }
        conf.sources.page_size = page_size;
    }
    conf.gene.validate()?;
    Ok(conf)
}

fn log_source_stats(name: &str, stats: &SourceStats) {
    tracing::info!(
        "  {}: {} received, {} seeded, {} updated, {} dropped",
        name,
        stats.received.separate_with_commas(),
        stats.seeded.separate_with_commas(),
        stats.updated.separate_with_commas(),
        stats.dropped.separate_with_commas()
    );
}

/// Main entry point for the `variants reconcile` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `variants reconcile`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let conf = load_conf(args)?;
    let gene = &conf.gene;
    tracing::info!(
        "Reconciling variants of {} at {}:{}-{}",
        &gene.id,
        &gene.chromosome,
        gene.start,
        gene.end
    );

    let timeout = Duration::from_secs(conf.sources.timeout_secs);
    let transport = HttpTransport::new(timeout)?;
    let before_fetching = Instant::now();

    let gnomad_records = if args.skip_gnomad {
        tracing::info!("Skipping gnomAD");
        Vec::new()
    } else {
        tracing::info!("Querying gnomAD variants...");
        gnomad::Client::new(
            &transport,
            &conf.sources.gnomad_url,
            &conf.sources.gnomad_dataset,
        )
        .fetch_region(
            &gene.chromosome,
            gene.start,
            gene.end,
            conf.sources.genome_release,
        )
    };
    tracing::info!("... found {} gnomAD variants", gnomad_records.len());

    let aou_records = if args.skip_aou {
        tracing::info!("Skipping All of Us");
        Vec::new()
    } else {
        tracing::info!("Querying All of Us variants...");
        aou::Client::new(
            HttpTransport::with_user_agent(timeout, aou::USER_AGENT)?,
            &conf.sources.aou_url,
            Duration::from_millis(conf.sources.page_delay_ms),
        )
        .fetch_region(
            &gene.chromosome,
            gene.start,
            gene.end,
            conf.sources.page_size,
        )
    };
    tracing::info!("... found {} All of Us variants", aou_records.len());
    tracing::debug!("time spent querying: {:?}", before_fetching.elapsed());

    tracing::info!("Loading SGE data from {:?}...", &args.path_sge);
    let sge_table = sge::load(&args.path_sge)?;
    tracing::info!(
        "... found {} SGE rows ({} without usable identifier)",
        sge_table.rows_read.separate_with_commas(),
        sge_table.rows_skipped.separate_with_commas()
    );

    let (variants, stats) = reconcile(gene, &gnomad_records, &aou_records, &sge_table.records);
    tracing::info!(
        "Merged into {} unique variants",
        stats.emitted.separate_with_commas()
    );
    log_source_stats("gnomAD", &stats.gnomad);
    log_source_stats("All of Us", &stats.aou);
    log_source_stats("SGE", &stats.sge);

    tracing::info!("Writing variants to {:?}...", &args.path_output);
    let mut sink = FileSink::new(&args.path_output, args.output_format);
    sink.upsert(&variants)?;
    tracing::info!("... done writing variants");

    Ok(())
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use clap_verbosity_flag::Verbosity;
    use pretty_assertions::assert_eq;

    use super::Args;
    use crate::common;
    use crate::sink::{FileSink, OutputFormat};

    fn args(tmp_dir: &temp_testdir::TempDir, output_format: OutputFormat) -> Args {
        Args {
            path_sge: PathBuf::from("tests/sources/sge/rnu4-2_sge.txt"),
            path_output: tmp_dir.join(format!("variants.{}", output_format)),
            output_format,
            path_conf: None,
            genome_release: None,
            page_size: None,
            skip_gnomad: true,
            skip_aou: true,
        }
    }

    #[rstest::rstest]
    #[case(OutputFormat::Tsv)]
    #[case(OutputFormat::Jsonl)]
    fn run_sge_only_smoke(#[case] output_format: OutputFormat) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let common_args = common::Args {
            verbose: Verbosity::new(0, 0),
        };
        let args = args(&tmp_dir, output_format);

        super::run(&common_args, &args)?;

        let stored = FileSink::new(&args.path_output, output_format).load()?;
        assert_eq!(4, stored.len());
        assert_eq!("chr12_120291800_A_G", stored[0].id);
        assert_eq!(Some(42), stored[0].nucleotide_position);
        assert_eq!(Some(145), stored[1].nucleotide_position);
        assert!(stored.iter().all(|v| v.gene_id == "RNU4-2"));

        // running again replaces rather than appends
        super::run(&common_args, &args)?;
        assert_eq!(
            stored,
            FileSink::new(&args.path_output, output_format).load()?
        );

        Ok(())
    }

    #[test]
    fn run_missing_sge_is_fatal() {
        let tmp_dir = temp_testdir::TempDir::default();
        let common_args = common::Args {
            verbose: Verbosity::new(0, 0),
        };
        let args = Args {
            path_sge: PathBuf::from("tests/sources/sge/missing.txt"),
            ..args(&tmp_dir, OutputFormat::Tsv)
        };

        assert!(super::run(&common_args, &args).is_err());
        assert!(!args.path_output.exists());
    }

    #[test]
    fn run_with_conf_file() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_conf = tmp_dir.join("conf.toml");
        std::fs::write(
            &path_conf,
            "[gene]\nid = \"RNU4-2-test\"\nchromosome = \"chr12\"\nstart = 120291800\nend = 120291903\n",
        )?;
        let common_args = common::Args {
            verbose: Verbosity::new(0, 0),
        };
        let args = Args {
            path_conf: Some(path_conf),
            ..args(&tmp_dir, OutputFormat::Tsv)
        };

        super::run(&common_args, &args)?;

        let stored = FileSink::new(&args.path_output, OutputFormat::Tsv).load()?;
        assert_eq!("RNU4-2-test", stored[0].gene_id);
        assert_eq!(Some(1), stored[0].nucleotide_position);
        assert_eq!("chr12_120291800_A_G", stored[0].id);

        Ok(())
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = Args {
            page_size: Some(0),
            ..args(&tmp_dir, OutputFormat::Tsv)
        };

        assert!(super::load_conf(&args).is_err());
    }
}
