//! Metric model and Prometheus text exposition rendering.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use tracing::trace;

use crate::config::PrometheusConfig;
use crate::error::{Result, ScrapeError};

/// The fixed shape shared by every sample of one metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub label_names: &'static [&'static str],
}

impl MetricDescriptor {
    pub const fn new(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
        }
    }

    /// Build a sample of this family.
    ///
    /// Label values pair up positionally with the descriptor's label names,
    /// so the counts must match.
    pub fn sample(&self, value: f64, label_values: &[&str]) -> Result<Sample> {
        if label_values.len() != self.label_names.len() {
            return Err(ScrapeError::LabelMismatch {
                metric: self.name,
                expected: self.label_names.len(),
                actual: label_values.len(),
            });
        }

        let labels = self
            .label_names
            .iter()
            .zip(label_values)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Ok(Sample {
            name: self.name,
            help: self.help,
            value,
            labels,
        })
    }
}

/// One gauge observation produced during a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: &'static str,
    pub help: &'static str,
    pub value: f64,
    /// Label pairs in descriptor order.
    pub labels: Vec<(String, String)>,
}

impl Sample {
    /// Value of a label, if the sample carries it.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Check a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Check a label name against `[a-zA-Z_][a-zA-Z0-9_]*`, rejecting the
/// reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build a full Prometheus metric name.
///
/// Format: `{prefix}_{name}`, or just `{name}` when the prefix is empty.
pub fn build_metric_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    }
}

/// Render samples in the Prometheus text exposition format.
///
/// Families appear in the order their first sample was produced, samples in
/// production order. A series repeated within one scrape is written once.
pub fn render(samples: &[Sample], config: &PrometheusConfig) -> String {
    let mut output = Vec::with_capacity(samples.len() * 100);

    // Group samples by family, keeping first-seen order
    let mut families: Vec<(&Sample, Vec<&Sample>)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for sample in samples {
        match positions.get(sample.name) {
            Some(&pos) => families[pos].1.push(sample),
            None => {
                positions.insert(sample.name, families.len());
                families.push((sample, vec![sample]));
            }
        }
    }

    let mut default_labels: Vec<(&String, &String)> = config.default_labels.iter().collect();
    default_labels.sort();

    for (first, series) in families {
        let name = build_metric_name(&config.prefix, first.name);

        writeln!(output, "# HELP {} {}", name, escape_help(first.help)).ok();
        writeln!(output, "# TYPE {} gauge", name).ok();

        let mut seen: HashSet<Vec<(String, String)>> = HashSet::with_capacity(series.len());
        for sample in series {
            let mut labels = sample.labels.clone();
            for (k, v) in &default_labels {
                if !labels.iter().any(|(lk, _)| lk == *k) {
                    labels.push(((*k).clone(), (*v).clone()));
                }
            }

            if !seen.insert(labels.clone()) {
                trace!(metric = %name, "Skipping duplicate series");
                continue;
            }

            writeln!(
                output,
                "{}{} {}",
                name,
                format_labels(&labels),
                format_value(sample.value)
            )
            .ok();
        }
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in HELP text.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: MetricDescriptor =
        MetricDescriptor::new("collection_size", "rows per collection", &["collection_name"]);
    const UP: MetricDescriptor = MetricDescriptor::new("up", "service is up", &[]);

    #[test]
    fn test_sample_aligns_labels_with_descriptor() {
        let sample = SIZE.sample(12.0, &["books"]).unwrap();

        assert_eq!(sample.name, "collection_size");
        assert_eq!(
            sample.labels,
            vec![("collection_name".to_string(), "books".to_string())]
        );
        assert_eq!(sample.label("collection_name"), Some("books"));
        assert_eq!(sample.label("missing"), None);
    }

    #[test]
    fn test_sample_rejects_wrong_label_count() {
        let err = SIZE.sample(1.0, &["books", "extra"]).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::LabelMismatch {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_render_family_header_and_lines() {
        let samples = vec![
            SIZE.sample(10.0, &["a"]).unwrap(),
            SIZE.sample(2.5, &["b"]).unwrap(),
        ];

        let output = render(&samples, &PrometheusConfig::default());

        assert_eq!(
            output,
            "# HELP collection_size rows per collection\n\
             # TYPE collection_size gauge\n\
             collection_size{collection_name=\"a\"} 10\n\
             collection_size{collection_name=\"b\"} 2.5\n"
        );
    }

    #[test]
    fn test_render_groups_families_in_first_seen_order() {
        let samples = vec![
            SIZE.sample(1.0, &["a"]).unwrap(),
            UP.sample(1.0, &[]).unwrap(),
            SIZE.sample(2.0, &["b"]).unwrap(),
        ];

        let output = render(&samples, &PrometheusConfig::default());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "# HELP collection_size rows per collection");
        assert_eq!(lines[3], "collection_size{collection_name=\"b\"} 2");
        assert_eq!(lines[4], "# HELP up service is up");
        assert_eq!(lines[6], "up 1");
    }

    #[test]
    fn test_render_skips_duplicate_series() {
        let samples = vec![
            SIZE.sample(100.0, &["a"]).unwrap(),
            SIZE.sample(100.0, &["a"]).unwrap(),
        ];

        let output = render(&samples, &PrometheusConfig::default());
        let series: Vec<&str> = output.lines().filter(|l| !l.starts_with('#')).collect();

        assert_eq!(series, vec!["collection_size{collection_name=\"a\"} 100"]);
    }

    #[test]
    fn test_render_prefix_and_default_labels() {
        let mut config = PrometheusConfig {
            prefix: "milvus".to_string(),
            ..Default::default()
        };
        config
            .default_labels
            .insert("env".to_string(), "prod".to_string());
        config
            .default_labels
            .insert("collection_name".to_string(), "ignored".to_string());

        let output = render(&[SIZE.sample(3.0, &["a"]).unwrap()], &config);

        assert!(output.contains("# TYPE milvus_collection_size gauge"));
        assert!(output.contains("milvus_collection_size{collection_name=\"a\",env=\"prod\"} 3"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[], &PrometheusConfig::default()), "");
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(3.25), "3.25");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_metric_name("milvus"));
        assert!(is_valid_metric_name("ns:sub_1"));
        assert!(!is_valid_metric_name("1milvus"));
        assert!(!is_valid_metric_name("mil-vus"));
        assert!(!is_valid_metric_name(""));

        assert!(is_valid_label_name("env"));
        assert!(is_valid_label_name("_private"));
        assert!(!is_valid_label_name("__reserved"));
        assert!(!is_valid_label_name("with:colon"));
    }

    #[test]
    fn test_build_metric_name() {
        assert_eq!(build_metric_name("", "indexed_rows"), "indexed_rows");
        assert_eq!(build_metric_name("milvus", "indexed_rows"), "milvus_indexed_rows");
    }
}
