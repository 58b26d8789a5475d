// ==========================================
// 销售报表平台 - 参考数据 CSV 解析
// ==========================================
// 支持: 产品目录 / 映射规则 / 对账样本 三种 CSV
// 约束:
//   - 文件缺失、缺必需列 → ImportError（致命）
//   - 单行字段非法 → ImportIssue（记录后跳过该行）
// ==========================================

use crate::consistency::ReconciliationSample;
use crate::domain::{CatalogEntry, MappingRule, PatternType, RawOrderLine};
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 原始行（列名小写 → 去空白后的值）
pub type RawRecord = HashMap<String, String>;

// ==========================================
// 行级问题与导入报告
// ==========================================

/// 单行数据问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    pub row_number: usize,   // 原始文件行号（表头为第 1 行）
    pub key: Option<String>, // sku / rule_id（如果可解析）
    pub field: String,
    pub message: String,
}

/// 导入报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub accepted: usize,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn rejected(&self) -> usize {
        self.total_rows.saturating_sub(self.accepted)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// 读取后的 CSV: 规范化表头 + (行号, 记录)
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<(usize, RawRecord)>,
}

impl CsvTable {
    /// 表头中缺失的第一个必需列（与数据行内容无关）
    fn missing_column(&self, columns: &[&str]) -> Option<String> {
        columns
            .iter()
            .find(|c| !self.headers.iter().any(|h| h == *c))
            .map(|c| c.to_string())
    }
}

/// 解析结果: 合法记录 + 报告
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub report: ImportReport,
}

// ==========================================
// CSV 读取
// ==========================================

/// 从文件读取 CSV（检查存在性与扩展名）
pub fn read_csv_file(path: &Path) -> ImportResult<CsvTable> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    if let Some(ext) = path.extension() {
        if !ext.eq_ignore_ascii_case("csv") {
            return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
        }
    }
    let file = File::open(path)?;
    read_csv(file)
}

/// 读取 CSV；跳过完全空白的行
///
/// 短行只填充已有的列，缺失字段由各解析函数记为行级问题。
pub fn read_csv<R: Read>(input: R) -> ImportResult<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行长度不一致
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let mut row_map = RawRecord::new();
        for (col_idx, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                row_map.insert(header.clone(), value.trim().to_string());
            }
        }

        if row_map.values().all(|v| v.is_empty()) {
            continue;
        }

        rows.push((row_idx + 2, row_map));
    }

    Ok(CsvTable { headers, rows })
}

fn require_columns(file: &str, table: &CsvTable, columns: &[&str]) -> ImportResult<()> {
    match table.missing_column(columns) {
        Some(column) => Err(ImportError::MissingColumn {
            file: file.to_string(),
            column,
        }),
        None => Ok(()),
    }
}

// ===== 字段读取辅助 =====

fn text(record: &RawRecord, field: &str) -> Option<String> {
    record
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn positive_u32(record: &RawRecord, field: &str) -> Result<Option<u32>, String> {
    match text(record, field) {
        None => Ok(None),
        Some(v) => match v.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(Some(n)),
            Ok(n) => Err(format!("{} 必须 >= 1，实际 {}", field, n)),
            Err(_) => Err(format!("{} 不是正整数: {}", field, v)),
        },
    }
}

fn flag(record: &RawRecord, field: &str, default: bool) -> Result<bool, String> {
    match text(record, field) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Ok(true),
            "0" | "false" | "no" | "n" => Ok(false),
            _ => Err(format!("{} 不是布尔值: {}", field, v)),
        },
    }
}

// ==========================================
// 产品目录
// ==========================================

/// 必需列: sku, units_per_display
/// 可选列: master_box_sku, primary_sku, category, items_per_master_box, is_active
pub fn parse_catalog_records(file: &str, table: &CsvTable) -> ImportResult<Parsed<CatalogEntry>> {
    require_columns(file, table, &["sku", "units_per_display"])?;
    let records = &table.rows;

    let mut report = ImportReport {
        total_rows: records.len(),
        ..ImportReport::default()
    };
    let mut entries = Vec::with_capacity(records.len());

    for (row_number, record) in records {
        let sku = text(record, "sku");
        let issue = |field: &str, message: String| ImportIssue {
            row_number: *row_number,
            key: sku.clone(),
            field: field.to_string(),
            message,
        };

        let Some(sku_value) = sku.clone() else {
            report.issues.push(issue("sku", "sku 为空".to_string()));
            continue;
        };
        let units_per_display = match positive_u32(record, "units_per_display") {
            Ok(v) => v,
            Err(msg) => {
                report.issues.push(issue("units_per_display", msg));
                continue;
            }
        };
        let items_per_master_box = match positive_u32(record, "items_per_master_box") {
            Ok(v) => v,
            Err(msg) => {
                report.issues.push(issue("items_per_master_box", msg));
                continue;
            }
        };
        let is_active = match flag(record, "is_active", true) {
            Ok(v) => v,
            Err(msg) => {
                report.issues.push(issue("is_active", msg));
                continue;
            }
        };

        let master_box_sku = text(record, "master_box_sku");
        if master_box_sku.is_some() && items_per_master_box.is_none() {
            report.issues.push(issue(
                "items_per_master_box",
                "配置了 master_box_sku 但缺少 items_per_master_box，按 1 换算".to_string(),
            ));
        }

        entries.push(CatalogEntry {
            sku: sku_value,
            master_box_sku,
            primary_sku: text(record, "primary_sku"),
            category: text(record, "category"),
            units_per_display,
            items_per_master_box,
            is_active,
        });
    }

    report.accepted = entries.len();
    Ok(Parsed {
        records: entries,
        report,
    })
}

pub fn parse_catalog_csv(path: &Path) -> ImportResult<Parsed<CatalogEntry>> {
    let table = read_csv_file(path)?;
    parse_catalog_records(&path.display().to_string(), &table)
}

// ==========================================
// 映射规则
// ==========================================

/// 必需列: rule_id, source_pattern, pattern_type
/// 可选列: source_filter, target_sku, quantity_multiplier, confidence, priority, is_active
pub fn parse_rule_records(file: &str, table: &CsvTable) -> ImportResult<Parsed<MappingRule>> {
    require_columns(file, table, &["rule_id", "source_pattern", "pattern_type"])?;
    let records = &table.rows;

    let mut report = ImportReport {
        total_rows: records.len(),
        ..ImportReport::default()
    };
    let mut rules = Vec::with_capacity(records.len());

    for (row_number, record) in records {
        let rule_id = text(record, "rule_id");
        let issue = |field: &str, message: String| ImportIssue {
            row_number: *row_number,
            key: rule_id.clone(),
            field: field.to_string(),
            message,
        };

        let Some(rule_id_value) = rule_id.clone() else {
            report.issues.push(issue("rule_id", "rule_id 为空".to_string()));
            continue;
        };
        let Some(source_pattern) = text(record, "source_pattern") else {
            report.issues.push(issue("source_pattern", "source_pattern 为空".to_string()));
            continue;
        };
        let raw_type = text(record, "pattern_type").unwrap_or_default();
        let Some(pattern_type) = PatternType::parse(&raw_type) else {
            report.issues.push(issue(
                "pattern_type",
                format!("未知的 pattern_type: '{}'", raw_type),
            ));
            continue;
        };
        let quantity_multiplier = match positive_u32(record, "quantity_multiplier") {
            Ok(v) => v.unwrap_or(1),
            Err(msg) => {
                report.issues.push(issue("quantity_multiplier", msg));
                continue;
            }
        };
        let confidence = match text(record, "confidence") {
            None => 95,
            Some(v) => match v.parse::<u8>() {
                Ok(c) if c <= 100 => c,
                _ => {
                    report.issues.push(issue(
                        "confidence",
                        format!("confidence 必须在 0..=100: {}", v),
                    ));
                    continue;
                }
            },
        };
        let priority = match text(record, "priority") {
            None => 0,
            Some(v) => match v.parse::<i32>() {
                Ok(p) => p,
                Err(_) => {
                    report.issues.push(issue("priority", format!("priority 不是整数: {}", v)));
                    continue;
                }
            },
        };
        let is_active = match flag(record, "is_active", true) {
            Ok(v) => v,
            Err(msg) => {
                report.issues.push(issue("is_active", msg));
                continue;
            }
        };

        rules.push(MappingRule {
            rule_id: rule_id_value,
            source_pattern,
            pattern_type,
            source_filter: text(record, "source_filter"),
            target_sku: text(record, "target_sku"),
            quantity_multiplier,
            confidence,
            priority,
            is_active,
        });
    }

    report.accepted = rules.len();
    Ok(Parsed {
        records: rules,
        report,
    })
}

pub fn parse_rules_csv(path: &Path) -> ImportResult<Parsed<MappingRule>> {
    let table = read_csv_file(path)?;
    parse_rule_records(&path.display().to_string(), &table)
}

// ==========================================
// 对账样本
// ==========================================

/// 必需列: raw_sku, source, quantity
/// 可选列: revenue（收入权重）
pub fn parse_sample_records(file: &str, table: &CsvTable) -> ImportResult<Parsed<ReconciliationSample>> {
    require_columns(file, table, &["raw_sku", "source", "quantity"])?;
    let records = &table.rows;

    let mut report = ImportReport {
        total_rows: records.len(),
        ..ImportReport::default()
    };
    let mut samples = Vec::with_capacity(records.len());

    for (row_number, record) in records {
        // raw_sku 允许为空（空标识即未匹配行），不做 trim 之外的处理
        let raw_sku = record.get("raw_sku").cloned().unwrap_or_default();
        let issue = |field: &str, message: String| ImportIssue {
            row_number: *row_number,
            key: Some(raw_sku.clone()),
            field: field.to_string(),
            message,
        };

        let source = text(record, "source").unwrap_or_default();
        let quantity = match text(record, "quantity").map(|v| v.parse::<u64>()) {
            Some(Ok(q)) => q,
            _ => {
                report.issues.push(issue("quantity", "quantity 不是非负整数".to_string()));
                continue;
            }
        };
        let revenue = match text(record, "revenue") {
            None => None,
            Some(v) => match v.parse::<f64>() {
                Ok(r) if r.is_finite() => Some(r),
                _ => {
                    report.issues.push(issue("revenue", format!("revenue 不是数值: {}", v)));
                    continue;
                }
            },
        };

        samples.push(ReconciliationSample::new(
            RawOrderLine::new(raw_sku.clone(), source, quantity),
            revenue,
        ));
    }

    report.accepted = samples.len();
    Ok(Parsed {
        records: samples,
        report,
    })
}

pub fn parse_samples_csv(path: &Path) -> ImportResult<Parsed<ReconciliationSample>> {
    let table = read_csv_file(path)?;
    parse_sample_records(&path.display().to_string(), &table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn records(csv_text: &str) -> CsvTable {
        read_csv(csv_text.as_bytes()).unwrap()
    }

    #[test]
    fn test_catalog_rows_are_validated() {
        let rows = records(
            "SKU,Units_Per_Display,master_box_sku,items_per_master_box,is_active\n\
             BAKC_U04010,1,BAKC_C02810,140,1\n\
             BAKC_U20010,5,,,\n\
             BAD_ZERO,0,,,\n\
             ,3,,,\n\
             OLD_SKU,1,,,0\n",
        );
        let parsed = parse_catalog_records("catalog.csv", &rows).unwrap();

        assert_eq!(parsed.report.total_rows, 5);
        assert_eq!(parsed.report.accepted, 3);
        assert_eq!(parsed.report.rejected(), 2);
        assert_eq!(parsed.records[0].master_box_factor(), 140);
        assert!(!parsed.records[2].is_active);

        let bad = &parsed.report.issues[0];
        assert_eq!(bad.row_number, 4);
        assert_eq!(bad.key.as_deref(), Some("BAD_ZERO"));
        assert_eq!(bad.field, "units_per_display");
        assert_eq!(parsed.report.issues[1].field, "sku");
    }

    #[test]
    fn test_rule_rows_are_validated() {
        let rows = records(
            "rule_id,source_pattern,pattern_type,target_sku,quantity_multiplier,confidence,priority\n\
             r1,KEEPERPACK,exact,KSMC_U03010,5,95,10\n\
             r2,ANU-,prefix,,,,\n\
             r3,X,fuzzy,T,1,90,0\n\
             r4,Y,contains,T,0,90,0\n\
             r5,Z,suffix,T,1,101,0\n",
        );
        let parsed = parse_rule_records("rules.csv", &rows).unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].quantity_multiplier, 5);
        assert_eq!(parsed.records[0].priority, 10);
        assert!(parsed.records[1].is_rewrite());
        assert_eq!(parsed.records[1].confidence, 95);

        let fields: Vec<&str> = parsed.report.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["pattern_type", "quantity_multiplier", "confidence"]);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let rows = records("sku,category\nBAKC_U04010,cracker\n");
        let err = parse_catalog_records("catalog.csv", &rows).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "units_per_display"));
    }

    #[test]
    fn test_header_only_file_still_checks_columns() {
        let rows = records("foo,bar\n");
        assert!(rows.rows.is_empty());
        let err = parse_catalog_records("catalog.csv", &rows).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "sku"));

        // 表头完整但无数据行: 空结果
        let empty = parse_catalog_records("catalog.csv", &records("sku,units_per_display\n")).unwrap();
        assert!(empty.records.is_empty());
        assert!(empty.report.is_clean());
    }

    #[test]
    fn test_short_first_row_is_row_issue() {
        let rows = records("raw_sku,source,quantity\nBAKC_U04010,relbase\nBAKC_U20010,relbase,3\n");
        let parsed = parse_sample_records("samples.csv", &rows).unwrap();

        assert_eq!(parsed.report.total_rows, 2);
        assert_eq!(parsed.report.accepted, 1);
        assert_eq!(parsed.records[0].line.raw_sku, "BAKC_U20010");
        assert_eq!(parsed.report.issues.len(), 1);
        assert_eq!(parsed.report.issues[0].row_number, 2);
        assert_eq!(parsed.report.issues[0].field, "quantity");
    }

    #[test]
    fn test_short_catalog_row_does_not_abort_import() {
        let rows = records("sku,units_per_display,master_box_sku\nBAKC_U04010\nBAKC_U20010,5,\n");
        let parsed = parse_catalog_records("catalog.csv", &rows).unwrap();

        // 缺 units_per_display 视为未配置（系数按 1）
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].units_per_display, None);
        assert_eq!(parsed.records[1].units_per_display, Some(5));
    }

    #[test]
    fn test_sample_file_with_revenue() {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "raw_sku,source,quantity,revenue").unwrap();
        writeln!(temp_file, "ANU-BAKC_U04010,relbase,4,1200.5").unwrap();
        writeln!(temp_file, "BAKC_U20010,shopify,2,").unwrap();
        writeln!(temp_file, "X,shopify,-1,").unwrap();

        let parsed = parse_samples_csv(temp_file.path()).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].revenue, Some(1200.5));
        assert_eq!(parsed.records[1].revenue, None);
        assert_eq!(parsed.report.issues[0].row_number, 4);
    }

    #[test]
    fn test_file_not_found() {
        let result = parse_catalog_csv(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
