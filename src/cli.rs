use clap::ValueEnum;

/// Memory assumed when the memory argument does not parse.
pub const DEFAULT_TOTAL_MEM_GB: f64 = 8.0;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Total memory in GB from the command line, falling back to 8 GB.
pub fn parse_total_memory(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(gb) if gb.is_finite() => gb,
        _ => DEFAULT_TOTAL_MEM_GB,
    }
}

/// Splits the space-separated publisher argument.
pub fn parse_publishers(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_memory() {
        assert_eq!(parse_total_memory("16"), 16.0);
        assert_eq!(parse_total_memory(" 24.5 "), 24.5);
        assert_eq!(parse_total_memory(""), DEFAULT_TOTAL_MEM_GB);
        assert_eq!(parse_total_memory("lots"), DEFAULT_TOTAL_MEM_GB);
        assert_eq!(parse_total_memory("NaN"), DEFAULT_TOTAL_MEM_GB);
    }

    #[test]
    fn test_parse_publishers() {
        assert_eq!(
            parse_publishers("Qwen  bartowski\tunsloth "),
            vec!["Qwen", "bartowski", "unsloth"]
        );
        assert!(parse_publishers("   ").is_empty());
    }
}
