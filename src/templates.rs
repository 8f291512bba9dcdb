pub const DEFAULT_VARIANTS_TSV: &str = include_str!("../templates/variants.tsv");
pub const REPORT_HTML: &str = include_str!("../templates/report.html");
