// ==========================================
// 销售报表平台 - CSV 参考数据来源
// ==========================================
// 职责: 以两份 CSV（目录 + 规则）作为 ReferenceSource
// 说明: 行级问题只告警不阻断；文件级错误让本次刷新失败，保留旧快照
// ==========================================

use crate::domain::{CatalogEntry, MappingRule};
use crate::engine::snapshot_store::ReferenceSource;
use crate::importer::reference_parser::{parse_catalog_csv, parse_rules_csv, ImportReport};
use std::error::Error;
use std::path::{Path, PathBuf};

pub struct CsvReferenceSource {
    catalog_path: PathBuf,
    rules_path: PathBuf,
}

impl CsvReferenceSource {
    pub fn new(catalog_path: impl Into<PathBuf>, rules_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            rules_path: rules_path.into(),
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn rules_path(&self) -> &Path {
        &self.rules_path
    }
}

fn log_report(stream: &str, path: &Path, report: &ImportReport) {
    for issue in &report.issues {
        tracing::warn!(
            stream,
            file = %path.display(),
            row = issue.row_number,
            key = issue.key.as_deref().unwrap_or(""),
            field = %issue.field,
            "{}",
            issue.message
        );
    }
    tracing::debug!(
        stream,
        file = %path.display(),
        total_rows = report.total_rows,
        accepted = report.accepted,
        "CSV 参考数据解析完成"
    );
}

impl ReferenceSource for CsvReferenceSource {
    fn describe(&self) -> String {
        format!(
            "csv:{}+{}",
            self.catalog_path.display(),
            self.rules_path.display()
        )
    }

    fn load_catalog(&self) -> Result<Vec<CatalogEntry>, Box<dyn Error + Send + Sync>> {
        let parsed = parse_catalog_csv(&self.catalog_path)?;
        log_report("catalog", &self.catalog_path, &parsed.report);
        Ok(parsed.records)
    }

    fn load_rules(&self) -> Result<Vec<MappingRule>, Box<dyn Error + Send + Sync>> {
        let parsed = parse_rules_csv(&self.rules_path)?;
        log_report("rules", &self.rules_path, &parsed.report);
        Ok(parsed.records)
    }
}
