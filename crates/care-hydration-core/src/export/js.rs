//! JS dashboard artifact, `const hydrationData = [...];`.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::models::DashboardData;

/// Render one dashboard as the JS file the front end loads.
pub fn generate_js_file_content(
    dashboard: &DashboardData,
    indent: usize,
) -> Result<String, serde_json::Error> {
    let data = to_indented_json(&dashboard.residents, indent)?;

    Ok(format!(
        "// Auto-generated dashboard data from hydration_goals.csv\n\
         // Generated on: {}\n\
         // Total residents: {}\n\
         // Validated and cleaned (duplicates merged)\n\
         \n\
         const hydrationData = {};\n",
        dashboard.generated_at,
        dashboard.resident_count(),
        data
    ))
}

fn to_indented_json<T: Serialize>(value: &T, indent: usize) -> Result<String, serde_json::Error> {
    let indent = vec![b' '; indent];
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
    value.serialize(&mut ser)?;
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// `(file name, content)` pairs ready for upload.
pub fn dashboard_uploads(
    dashboards: &[DashboardData],
    indent: usize,
) -> Result<Vec<(String, String)>, serde_json::Error> {
    dashboards
        .iter()
        .map(|d| Ok((d.file_name(), generate_js_file_content(d, indent)?)))
        .collect()
}
