//! Output formatting

use sqlreview_core::{Advice, AdviceStatus};

use crate::args::OutputFormat;

/// Output formatter for advice
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print advice in the configured format
    pub fn print_advice(&self, advice: &[Advice], source: &str) {
        match self.format {
            OutputFormat::Human => self.print_human(advice, source),
            OutputFormat::Json => println!("{}", self.to_json(advice)),
            OutputFormat::Sarif => println!("{}", self.to_sarif(advice)),
        }
    }

    fn print_human(&self, advice: &[Advice], source: &str) {
        for item in advice {
            let status = match item.status {
                AdviceStatus::Error => "\x1b[31merror\x1b[0m",
                AdviceStatus::Warn => "\x1b[33mwarning\x1b[0m",
                AdviceStatus::Success => "\x1b[32msuccess\x1b[0m",
            };

            eprintln!("{}[{}]: {}", status, item.title, item.content);

            let line = item.position.line;
            match item.position.column {
                Some(column) => eprintln!("  --> {}:{}:{}", self.file_name, line, column),
                None => eprintln!("  --> {}:{}", self.file_name, line),
            }

            if let Some(source_line) = get_source_line(source, line) {
                eprintln!("   |");
                eprintln!("{:>3} | {}", line, source_line);
                if let Some(column) = item.position.column {
                    eprintln!("   | {}^", " ".repeat(column.saturating_sub(1)));
                }
            }

            eprintln!("   = code: {}", item.code);
            eprintln!();
        }
    }

    fn to_json(&self, advice: &[Advice]) -> String {
        let output = serde_json::json!({
            "file": self.file_name,
            "advice": advice
        });
        pretty(&output)
    }

    fn to_sarif(&self, advice: &[Advice]) -> String {
        let results: Vec<serde_json::Value> = advice
            .iter()
            .map(|a| {
                let mut region = serde_json::json!({ "startLine": a.position.line });
                if let Some(column) = a.position.column {
                    region["startColumn"] = serde_json::json!(column);
                }
                serde_json::json!({
                    "ruleId": a.title,
                    "level": match a.status {
                        AdviceStatus::Error => "error",
                        AdviceStatus::Warn => "warning",
                        AdviceStatus::Success => "note",
                    },
                    "message": {
                        "text": a.content
                    },
                    "properties": {
                        "code": a.code
                    },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": self.file_name
                            },
                            "region": region
                        }
                    }]
                })
            })
            .collect();

        let sarif = serde_json::json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "sqlreview",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                },
                "results": results
            }]
        });

        pretty(&sarif)
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.checked_sub(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlreview_core::{Code, Position};

    fn sample() -> Vec<Advice> {
        vec![Advice::new(
            AdviceStatus::Error,
            Code::StatementNoWhere,
            "statement.where.require",
            "\"DELETE FROM t\" requires WHERE clause",
            Position::line(2),
        )]
    }

    #[test]
    fn test_json_output() {
        let formatter = OutputFormatter::new(OutputFormat::Json, "a.sql".to_string());
        let value: serde_json::Value = serde_json::from_str(&formatter.to_json(&sample())).unwrap();
        assert_eq!(value["file"], "a.sql");
        assert_eq!(value["advice"][0]["code"], 202);
        assert_eq!(value["advice"][0]["status"], "error");
        assert_eq!(value["advice"][0]["position"]["line"], 2);
    }

    #[test]
    fn test_sarif_output() {
        let formatter = OutputFormatter::new(OutputFormat::Sarif, "a.sql".to_string());
        let value: serde_json::Value =
            serde_json::from_str(&formatter.to_sarif(&sample())).unwrap();
        let result = &value["runs"][0]["results"][0];
        assert_eq!(result["ruleId"], "statement.where.require");
        assert_eq!(result["level"], "error");
        assert_eq!(
            result["locations"][0]["physicalLocation"]["region"]["startLine"],
            2
        );
    }

    #[test]
    fn test_source_line_lookup() {
        assert_eq!(get_source_line("a\nb\nc", 2), Some("b"));
        assert_eq!(get_source_line("a", 0), None);
    }
}
