//! CSV interchange for prompt lists.
//!
//! Column order is fixed by [`CSV_HEADER`]. Only `content` may contain
//! arbitrary text; it is always written quoted.

use promptseq_core::error::ValidationError;
use promptseq_core::prompt::{PromptDefaults, PromptSpec, RawPromptSpec, Scalar};
use thiserror::Error;
use tracing::warn;

pub const CSV_HEADER: &str = "Role,Model,Max Tokens,Temperature,useMemory,predecessor,content";

const COLUMNS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsvError {
    #[error("Unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("Line {line}: {source}")]
    Validation {
        line: usize,
        #[source]
        source: ValidationError,
    },
}

/// Serialize prompts, header first, one `\n`-terminated row each.
pub fn to_csv(prompts: &[PromptSpec]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + prompts.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for prompt in prompts {
        let max_tokens = prompt
            .max_tokens
            .map(|n| n.to_string())
            .unwrap_or_default();

        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            prompt.role,
            quote_if_needed(&prompt.model),
            max_tokens,
            prompt.temperature,
            prompt.use_memory,
            prompt.predecessor,
            quote(&prompt.content),
        ));
    }
    out
}

/// A header plus one example row.
pub fn template() -> String {
    to_csv(&[PromptSpec::user("Your prompt here")])
}

/// Parse CSV text into raw prompts.
///
/// Blank and short rows are skipped. A leading header row (first field
/// `role`, any case) is skipped too.
pub fn parse_csv(text: &str) -> Result<Vec<RawPromptSpec>, CsvError> {
    Ok(parse_rows(text)?.into_iter().map(|(_, raw)| raw).collect())
}

/// [`parse_csv`] followed by normalization of every row.
///
/// A row that fails normalization is reported by the line it starts on.
pub fn parse_prompts(text: &str, defaults: &PromptDefaults) -> Result<Vec<PromptSpec>, CsvError> {
    parse_rows(text)?
        .into_iter()
        .map(|(line, raw)| {
            raw.normalize_with(defaults)
                .map_err(|source| CsvError::Validation { line, source })
        })
        .collect()
}

/// Raw prompts paired with the file line each row starts on.
fn parse_rows(text: &str) -> Result<Vec<(usize, RawPromptSpec)>, CsvError> {
    let records = parse_records(text)?;
    let mut prompts = Vec::with_capacity(records.len());

    for (i, record) in records.into_iter().enumerate() {
        if i == 0
            && record
                .fields
                .first()
                .is_some_and(|f| f.eq_ignore_ascii_case("role"))
        {
            continue;
        }
        if record.fields.len() < COLUMNS {
            warn!(
                line = record.line,
                fields = record.fields.len(),
                "Skipping short CSV row"
            );
            continue;
        }
        prompts.push((record.line, raw_from_fields(record.fields)));
    }

    Ok(prompts)
}

fn raw_from_fields(fields: Vec<String>) -> RawPromptSpec {
    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();

    let role = next();
    let model = next();
    let max_tokens = next();
    let temperature = next();
    let use_memory = next();
    let predecessor = next();
    // unquoted commas in the last column belong to the content
    let content = fields.collect::<Vec<_>>().join(",");

    RawPromptSpec {
        role: Some(role),
        content: Some(content),
        model: Some(model),
        temperature: Some(Scalar::Text(temperature)),
        max_tokens: Some(Scalar::Text(max_tokens)),
        use_memory: Some(Scalar::Bool(use_memory.eq_ignore_ascii_case("true"))),
        predecessor: Some(Scalar::Bool(predecessor.eq_ignore_ascii_case("true"))),
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn quote_if_needed(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        quote(field)
    } else {
        field.to_string()
    }
}

/// One parsed row and the line it started on.
#[derive(Debug, PartialEq)]
struct Record {
    line: usize,
    fields: Vec<String>,
}

fn parse_records(text: &str) -> Result<Vec<Record>, CsvError> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();

    let mut in_quotes = false;
    let mut field_quoted = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' && chars.peek() == Some(&'\n') {
            continue;
        }

        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !field_quoted && field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                field_quoted = true;
                quote_line = line;
            }
            ',' => fields.push(finish_field(&mut field, &mut field_quoted)),
            '\n' => {
                fields.push(finish_field(&mut field, &mut field_quoted));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote { line: quote_line });
    }

    if !fields.is_empty() || field_quoted || !field.trim().is_empty() {
        fields.push(finish_field(&mut field, &mut field_quoted));
        push_record(&mut records, record_line, fields);
    }

    Ok(records)
}

fn finish_field(field: &mut String, quoted: &mut bool) -> String {
    let value = std::mem::take(field);
    if std::mem::take(quoted) {
        value
    } else {
        value.trim().to_string()
    }
}

fn push_record(records: &mut Vec<Record>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].is_empty();
    if !blank {
        records.push(Record { line, fields });
    }
}
