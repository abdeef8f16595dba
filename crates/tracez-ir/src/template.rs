//! Argument templates for instrumented commands.
//!
//! A template is literal text with `{...}` placeholders:
//! - `{var:NAME}` — the witness value of variable `NAME`
//! - `{workdir}` — the directory the run executes in
//! - `{report}` — the path the execution report is expected at
//!
//! `{{` and `}}` are literal braces.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Var(&'a str),
    Workdir,
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder in `{0}`")]
    Unterminated(String),
    #[error("unknown placeholder `{{{placeholder}}}` in `{template}`")]
    UnknownPlaceholder {
        placeholder: String,
        template: String,
    },
}

/// Split a template into segments.
pub fn segments(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut out = Vec::new();
    let mut rest = template;
    while !rest.is_empty() {
        let Some(idx) = rest.find(['{', '}']) else {
            out.push(Segment::Literal(rest));
            break;
        };
        if idx > 0 {
            out.push(Segment::Literal(&rest[..idx]));
        }
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix("{{") {
            out.push(Segment::Brace('{'));
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            out.push(Segment::Brace('}'));
            rest = after;
            continue;
        }
        if tail.starts_with('}') {
            return Err(TemplateError::Unterminated(template.to_string()));
        }
        let close = tail
            .find('}')
            .ok_or_else(|| TemplateError::Unterminated(template.to_string()))?;
        let name = &tail[1..close];
        let segment = match name {
            "workdir" => Segment::Workdir,
            "report" => Segment::Report,
            _ => match name.strip_prefix("var:") {
                Some(var) if !var.is_empty() => Segment::Var(var),
                _ => {
                    return Err(TemplateError::UnknownPlaceholder {
                        placeholder: name.to_string(),
                        template: template.to_string(),
                    })
                }
            },
        };
        out.push(segment);
        rest = &tail[close + 1..];
    }
    Ok(out)
}

/// Variables referenced through `{var:NAME}` placeholders.
pub fn referenced_vars(template: &str) -> Result<Vec<&str>, TemplateError> {
    Ok(segments(template)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Var(name) => Some(name),
            _ => None,
        })
        .collect())
}
