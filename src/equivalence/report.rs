use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

/// Which of the two compared containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::First => write!(f, "file 1"),
            Side::Second => write!(f, "file 2"),
        }
    }
}

/// A single difference between two containers
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// A node present on one side only
    Missing { path: String, from: Side },
    /// Group on one side, dataset on the other
    KindDiffers { path: String },
    /// An attribute present on one side only
    AttributeMissing { path: String, name: String, from: Side },
    AttributeValue {
        path: String,
        name: String,
        first: String,
        second: String,
    },
    /// Different row counts
    Shape { path: String, first: usize, second: usize },
    /// A field present on one side only
    FieldMissing { path: String, field: String, from: Side },
    Element {
        path: String,
        field: Option<String>,
        row: usize,
        first: String,
        second: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Missing { path, from } => write!(f, "{} missing from {}", path, from),
            Mismatch::KindDiffers { path } => write!(f, "{} is a group in one file and a dataset in the other", path),
            Mismatch::AttributeMissing { path, name, from } => {
                write!(f, "{} attribute '{}' missing from {}", path, name, from)
            }
            Mismatch::AttributeValue {
                path,
                name,
                first,
                second,
            } => write!(f, "{} attribute '{}' not equal: {} != {}", path, name, first, second),
            Mismatch::Shape { path, first, second } => {
                write!(f, "{} has {} rows in file 1 and {} in file 2", path, first, second)
            }
            Mismatch::FieldMissing { path, field, from } => {
                write!(f, "{} field '{}' missing from {}", path, field, from)
            }
            Mismatch::Element {
                path,
                field,
                row,
                first,
                second,
            } => match field {
                Some(field) => write!(f, "{}['{}'][{}] not equal: {} != {}", path, field, row, first, second),
                None => write!(f, "{}[{}] not equal: {} != {}", path, row, first, second),
            },
        }
    }
}

/// Outcome of comparing two containers
#[derive(Debug)]
pub struct EquivalenceReport {
    pub first: String,
    pub second: String,
    pub mismatches: Vec<Mismatch>,
}

impl EquivalenceReport {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            mismatches: Vec::new(),
        }
    }

    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    pub fn is_equivalent(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Equivalence Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("==================").cyan()));
            output.push_str(&format!("{}: {}\n", style("File 1").bold(), self.first));
            output.push_str(&format!("{}: {}\n\n", style("File 2").bold(), self.second));

            for mismatch in &self.mismatches {
                output.push_str(&format!("[{}] {}\n", FAIL, style(mismatch).red()));
            }
            if !self.mismatches.is_empty() {
                output.push('\n');
            }

            if self.is_equivalent() {
                output.push_str(&format!("{}\n", style("Files are equivalent").green().bold()));
            } else {
                output.push_str(&format!(
                    "{}\n",
                    style(format!("{} mismatches found", self.mismatch_count())).red().bold()
                ));
            }
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for EquivalenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Equivalence Report")?;
        writeln!(f, "==================")?;
        writeln!(f, "File 1: {}", self.first)?;
        writeln!(f, "File 2: {}", self.second)?;
        writeln!(f)?;

        for mismatch in &self.mismatches {
            writeln!(f, "[✗] {}", mismatch)?;
        }
        if !self.mismatches.is_empty() {
            writeln!(f)?;
        }

        if self.is_equivalent() {
            writeln!(f, "Files are equivalent")
        } else {
            writeln!(f, "{} mismatches found", self.mismatch_count())
        }
    }
}
