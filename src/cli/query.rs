//! Run queries and describe sources for the command line

use super::{CliError, SourceOptions};
use crate::{Field, JsonPrinter, parse};

/// Options for the query command
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// The SQL query to run
    pub query: String,
    pub sources: SourceOptions,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
}

/// Result of a query command
#[derive(Debug)]
pub enum QueryOutput {
    /// Syntax validation passed
    SyntaxValid,
    /// Result rows rendered as a JSON array
    Rows(String),
}

/// Parse and, unless `syntax_only` is set, execute the query
pub fn execute_query(options: &QueryOptions) -> Result<QueryOutput, CliError> {
    let statement = parse(&options.query)?;
    if options.syntax_only {
        return Ok(QueryOutput::SyntaxValid);
    }

    let engine = options.sources.build_engine();
    let rows = engine.execute(&statement)?;
    Ok(QueryOutput::Rows(
        JsonPrinter::new(options.pretty).print_records(&rows),
    ))
}

/// Inferred columns of one table
pub fn describe(sources: &SourceOptions, table: &str) -> Result<Vec<Field>, CliError> {
    let engine = sources.build_engine();
    Ok(engine.describe_schema(table)?)
}

/// One line per field: name, type, and whether it may be null
pub fn format_fields(fields: &[Field]) -> String {
    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut output = String::new();
    for field in fields {
        output.push_str(&format!(
            "{:<width$}  {}{}\n",
            field.name,
            field.data_type,
            if field.nullable { " (nullable)" } else { "" },
            width = width
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_only_skips_loading() {
        let options = QueryOptions {
            query: "SELECT * FROM missing_table".to_string(),
            syntax_only: true,
            ..Default::default()
        };
        assert!(matches!(
            execute_query(&options),
            Ok(QueryOutput::SyntaxValid)
        ));
    }

    #[test]
    fn fields_align_by_name() {
        let fields = vec![
            Field {
                name: "id".to_string(),
                data_type: "string".to_string(),
                nullable: false,
            },
            Field {
                name: "email".to_string(),
                data_type: "string".to_string(),
                nullable: true,
            },
        ];
        assert_eq!(
            format_fields(&fields),
            "id     string\nemail  string (nullable)\n"
        );
    }
}
