use anyhow::Result;
use clap::Parser;
use log::debug;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{DiscoveryMode, DumpConfig, TreeErrorPolicy};
use crate::consts::DATA_SUBDIR;
use crate::dump::{write_entries, write_header};
use crate::error::DumpError;
use crate::inspect::inspect;
use crate::metrics;
use crate::raw::LogStore;
use crate::util::parse_height;

#[derive(Parser, Debug)]
#[command(
    name = "dump",
    version,
    about = "Dump every module of a versioned merkleized KV store at a given height"
)]
pub struct Cli {
    /// Каталог узла; store лежит в <dataDir>/data. Без него печатается usage и exit 0.
    pub data_dir: Option<PathBuf>,

    /// Целевая высота; отсутствует, отрицательная или не число — latest
    #[arg(allow_hyphen_values = true)]
    pub height: Option<String>,

    /// Стратегия обнаружения модулей (перекрывает SD_DISCOVERY)
    #[arg(long)]
    pub discovery: Option<DiscoveryMode>,

    /// Пропускать модули с неоткрываемым деревом вместо аварийного выхода
    #[arg(long)]
    pub skip_broken: bool,

    /// Не пересчитывать хэши узлов при загрузке
    #[arg(long)]
    pub no_verify: bool,
}

impl Cli {
    /// ENV-конфиг + флаги командной строки поверх.
    pub fn config(&self) -> DumpConfig {
        let mut cfg = DumpConfig::from_env();
        if let Some(mode) = self.discovery {
            cfg = cfg.with_discovery(mode);
        }
        if self.skip_broken {
            cfg = cfg.with_tree_error_policy(TreeErrorPolicy::Skip);
        }
        if self.no_verify {
            cfg = cfg.with_verify_nodes(false);
        }
        cfg.build()
    }
}

pub const USAGE: &str = "usage: dump <dataDir> <height(optional)>";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    dispatch(&cli, &mut out)?;

    let m = metrics::snapshot();
    debug!(
        "metrics: raw_records={} raw_tail_skipped={}B tree_nodes={} modules_dumped={} modules_skipped={} entries={} avg_entries_per_module={:.1}",
        m.raw_records_replayed,
        m.raw_tail_bytes_skipped,
        m.tree_nodes_loaded,
        m.modules_dumped,
        m.modules_skipped,
        m.entries_dumped,
        m.avg_entries_per_module()
    );
    Ok(())
}

/// Разобранная командная строка -> прогон. Без dataDir: только usage, Ok.
pub fn dispatch<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let Some(root) = &cli.data_dir else {
        writeln!(out, "{}", USAGE)?;
        out.flush()?;
        return Ok(());
    };
    let cfg = cli.config();
    let height = parse_height(cli.height.as_deref());
    exec(root, height, &cfg, out)
}

/// Один прогон дампа в `out`. Отсутствующий `<dataDir>/data` — не ошибка:
/// печатается `dataDir not found` и возвращается Ok.
pub fn exec<W: Write>(root: &Path, height: Option<u64>, cfg: &DumpConfig, out: &mut W) -> Result<()> {
    debug!("{}", cfg);

    let data_dir = root.join(DATA_SUBDIR);
    if !data_dir.is_dir() {
        debug!("{}", DumpError::DataDirMissing(data_dir));
        writeln!(out, "dir: {}", root.display())?;
        writeln!(out, "dataDir not found")?;
        out.flush()?;
        return Ok(());
    }

    let store = LogStore::open_ro(&data_dir).map_err(|e| DumpError::StoreOpenFailure {
        path: data_dir.clone(),
        reason: format!("{:#}", e),
    })?;

    // Всё разрешается до первой строки вывода: при ошибке stdout пуст.
    let report = inspect(&store, height, cfg)?;

    writeln!(out, "dir: {}", root.display())?;
    write_header(out, report.latest, report.target, &report.modules)?;
    write_entries(out, &report.assembly)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_prints_usage_and_succeeds() -> Result<()> {
        let cli = Cli::try_parse_from(["dump"])?;
        assert!(cli.data_dir.is_none());

        let mut out = Vec::new();
        dispatch(&cli, &mut out)?;
        assert_eq!(String::from_utf8(out)?, format!("{}\n", USAGE));
        Ok(())
    }

    #[test]
    fn positional_height_and_flags_parse() -> Result<()> {
        let cli = Cli::try_parse_from(["dump", "/node", "-1", "--skip-broken", "--discovery", "scan"])?;
        assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/node")));
        assert_eq!(parse_height(cli.height.as_deref()), None);
        let cfg = cli.config();
        assert_eq!(cfg.discovery, DiscoveryMode::Scan);
        assert_eq!(cfg.on_tree_error, TreeErrorPolicy::Skip);
        Ok(())
    }
}
