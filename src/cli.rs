// Command line entry points besides the interactive UI

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use crate::api::ApiClient;
use crate::config::Config;
use crate::export::ExportFormat;
use crate::listing::ListQuery;
use crate::models::Lookups;
use crate::records::RecordKind;
use crate::service::{self, TablePage};

#[derive(Parser)]
#[command(name = "expense_manager")]
#[command(about = "Expense Manager - bills and reports for the expenses backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open the interactive interface (the default)
    Tui,

    /// Print one page of records as a plain table
    List {
        #[arg(value_enum)]
        kind: RecordKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Export every matching record to a spreadsheet and print its path
    Export {
        #[arg(value_enum)]
        kind: RecordKind,
        #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
        /// Directory to write into (defaults to EXPORT_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List the record kinds
    Kinds,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,
    /// Earliest date, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Latest date, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Shop, vehicle or employee id, depending on the kind
    #[arg(long)]
    pub lookup_id: Option<u64>,
}

impl FilterArgs {
    pub fn to_query(&self, kind: RecordKind, per_page: u32) -> Result<ListQuery> {
        let mut query = ListQuery::new(per_page);
        if let Some(search) = &self.search {
            query.set_search(search);
        }
        query.set_range(self.from, self.to)?;
        if self.lookup_id.is_some() && kind.filter_lookup().is_none() {
            bail!("{kind} cannot be filtered by --lookup-id");
        }
        query.set_lookup(self.lookup_id);
        Ok(query)
    }
}

/// Command line name of a kind, e.g. `fuel-bill`.
pub fn kind_name(kind: RecordKind) -> String {
    kind.to_possible_value()
        .map(|value| value.get_name().to_string())
        .unwrap_or_else(|| kind.resource().to_string())
}

async fn lookups_or_default(api: &ApiClient) -> Lookups {
    api.load_lookups().await.unwrap_or_else(|err| {
        warn!(error = %err, "lookups unavailable, showing ids");
        Lookups::default()
    })
}

pub async fn run_list(config: &Config, kind: RecordKind, page: u32, filters: &FilterArgs) -> Result<()> {
    let mut query = filters.to_query(kind, config.page_size)?;
    query.page = page.max(1);

    let api = ApiClient::new(config)?;
    let lookups = lookups_or_default(&api).await;
    let table = service::load_page(&api, kind, &query, &lookups).await?;
    print!("{}", plain_table(&table));
    Ok(())
}

pub async fn run_export(
    config: &Config,
    kind: RecordKind,
    format: ExportFormat,
    out: Option<PathBuf>,
    filters: &FilterArgs,
) -> Result<()> {
    let query = filters.to_query(kind, config.page_size)?;
    let dir = out.unwrap_or_else(|| config.export_dir.clone());

    let api = ApiClient::new(config)?;
    let lookups = lookups_or_default(&api).await;
    let path = service::export(&api, kind, &query, &lookups, format, dir).await?;
    println!("{}", path.display());
    Ok(())
}

pub fn run_kinds() {
    for kind in RecordKind::ALL {
        println!("{:<24}{}", kind_name(kind), kind.title());
    }
}

/// Left-aligned text table with a paging footer.
pub fn plain_table(table: &TablePage) -> String {
    let header: Vec<String> = std::iter::once("ID".to_string())
        .chain(table.columns.iter().map(|c| c.title.to_string()))
        .collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.id.map(|id| id.to_string()).unwrap_or_default())
                .chain(row.cells.iter().map(|cell| cell.to_string()))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };

    let mut out = format_line(&header);
    for row in &rows {
        out.push_str(&format_line(row));
    }
    out.push_str(&format!(
        "Page {}/{} | {} record(s)\n",
        table.page, table.page_count, table.total
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CellValue;
    use crate::service::TableRow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["expense_manager"]).unwrap();
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["expense_manager", "tui"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Tui)));
    }

    #[test]
    fn list_takes_kind_and_filters() {
        let cli = Cli::try_parse_from([
            "expense_manager",
            "list",
            "fuel-bill",
            "--page",
            "3",
            "--from",
            "2024-01-01",
            "--lookup-id",
            "7",
        ])
        .unwrap();

        match cli.command {
            Some(Command::List { kind, page, filters }) => {
                assert_eq!(kind, RecordKind::FuelBill);
                assert_eq!(page, 3);
                assert_eq!(filters.from, Some(date(2024, 1, 1)));
                assert_eq!(filters.lookup_id, Some(7));
                assert_eq!(filters.search, None);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn export_defaults_to_xlsx() {
        let cli = Cli::try_parse_from(["expense_manager", "export", "payroll-report"]).unwrap();
        match cli.command {
            Some(Command::Export { kind, format, out, .. }) => {
                assert_eq!(kind, RecordKind::PayrollReport);
                assert_eq!(format, ExportFormat::Xlsx);
                assert!(out.is_none());
            }
            _ => panic!("expected export"),
        }

        let cli = Cli::try_parse_from([
            "expense_manager",
            "export",
            "mess-bill",
            "--format",
            "csv",
            "--out",
            "/tmp/out",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Export { format: ExportFormat::Csv, .. })
        ));
    }

    #[test]
    fn bad_dates_and_kinds_are_rejected() {
        assert!(Cli::try_parse_from(["expense_manager", "list", "general-bill", "--to", "31/01/2024"]).is_err());
        assert!(Cli::try_parse_from(["expense_manager", "list", "invoices"]).is_err());
    }

    #[test]
    fn filters_build_a_query() {
        let filters = FilterArgs {
            search: Some("  diesel ".into()),
            from: Some(date(2024, 1, 1)),
            to: Some(date(2024, 1, 31)),
            lookup_id: Some(2),
        };
        let query = filters.to_query(RecordKind::FuelBill, 25).unwrap();
        assert_eq!(query.search.as_deref(), Some("diesel"));
        assert_eq!(query.per_page, 25);
        assert_eq!(query.lookup_id, Some(2));

        let inverted = FilterArgs {
            from: Some(date(2024, 2, 1)),
            to: Some(date(2024, 1, 1)),
            ..FilterArgs::default()
        };
        assert!(inverted.to_query(RecordKind::FuelBill, 10).is_err());

        let no_lookup = FilterArgs {
            lookup_id: Some(1),
            ..FilterArgs::default()
        };
        assert!(no_lookup.to_query(RecordKind::AdibReport, 10).is_err());
    }

    #[test]
    fn kind_names_match_the_parser() {
        assert_eq!(kind_name(RecordKind::LabourExpenseReport), "labour-expense-report");
        for kind in RecordKind::ALL {
            let cli = Cli::try_parse_from(["expense_manager", "list", kind_name(kind).as_str()]).unwrap();
            assert!(matches!(cli.command, Some(Command::List { kind: k, .. }) if k == kind));
        }
    }

    #[test]
    fn plain_table_aligns_columns() {
        let mut table = TablePage::empty(RecordKind::AdibReport);
        table.columns = &[];
        table.rows = vec![TableRow {
            id: Some(12),
            cells: vec![],
        }];
        table.total = 1;
        assert_eq!(plain_table(&table), "ID\n12\nPage 1/1 | 1 record(s)\n");

        let mut table = TablePage::empty(RecordKind::MessBill);
        let cells: Vec<CellValue> = table.columns.iter().map(|_| CellValue::Empty).collect();
        table.rows = vec![TableRow { id: Some(3), cells }];
        let out = plain_table(&table);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID  "));
        assert_eq!(lines[1], "3");
    }
}
