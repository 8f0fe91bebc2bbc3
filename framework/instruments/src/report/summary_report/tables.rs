use tabled::Tabled;

#[derive(Tabled)]
pub struct TargetRow {
    pub target: String,
    pub requests: usize,
    pub ok: usize,
    pub errors: usize,
    pub total_bytes: usize,
    #[tabled(display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(display = "opt_float2")]
    pub min_time_ms: Option<f64>,
    #[tabled(display = "opt_float2")]
    pub max_time_ms: Option<f64>,
}

#[derive(Tabled)]
pub struct RunRow {
    #[tabled(rename = "#")]
    pub test_number: usize,
    pub variant: String,
    pub processed: String,
    #[tabled(display = "float2")]
    pub elapsed_s: f64,
    pub peak_memory_mb: u64,
    pub peak_threads: usize,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

fn opt_float2(n: &Option<f64>) -> String {
    n.map(|n| float2(&n)).unwrap_or_else(|| "-".to_string())
}
