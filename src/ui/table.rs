use tabled::{settings::Style, Table, Tabled};

use crate::linker::AnnotationSummary;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct AnnotationRow {
    #[tabled(rename = "Annotation")]
    name: String,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Line")]
    line: String,
    #[tabled(rename = "Variables")]
    variables: String,
}

pub fn annotations_table(annotations: &[AnnotationSummary]) -> String {
    if annotations.is_empty() {
        return String::new();
    }
    let rows: Vec<AnnotationRow> = annotations
        .iter()
        .map(|a| AnnotationRow {
            name: a.name.clone(),
            filename: a.filename.clone(),
            line: a.line_number.map(|l| l.to_string()).unwrap_or_default(),
            variables: a
                .variables
                .iter()
                .map(|v| v.name.clone().unwrap_or_else(|| v.id.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::linker::LinkedVariable;

    #[test]
    fn test_stats_table_contains_rows() {
        let table = stats_table(&[("Nodes", "14".to_string()), ("Annotations", "1".to_string())]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Annotations"));
        assert!(table.contains("14"));
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_annotations_table_lists_variables() {
        let summary = AnnotationSummary {
            id: NodeId(1),
            name: "y".into(),
            filename: "main.rs".into(),
            line_number: Some(3),
            submission: None,
            variables: vec![
                LinkedVariable { id: NodeId(2), name: Some("y".into()) },
                LinkedVariable { id: NodeId(3), name: None },
            ],
        };
        let table = annotations_table(&[summary]);
        assert!(table.contains("main.rs"));
        assert!(table.contains("y, #3"));
        assert!(annotations_table(&[]).is_empty());
    }
}
