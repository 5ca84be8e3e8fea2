//! URL template resolution
//!
//! Download URLs are described by templates with `{name}`, `{version}` and
//! `{provider}` placeholders. Substitution is literal and single-pass: a
//! substituted value is never re-scanned for tokens, and there is no escape
//! mechanism.

/// Substitute the named placeholders in `template`
///
/// Tokens absent from the template are simply absent from the output; an
/// unrecognized `{...}` sequence is carried through verbatim.
pub fn resolve(template: &str, name: &str, version: &str, provider: &str) -> String {
    let mut out = String::with_capacity(template.len() + name.len() + version.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        match tail.find('}') {
            Some(close) => match &tail[1..close] {
                "name" => {
                    out.push_str(name);
                    rest = &tail[close + 1..];
                }
                "version" => {
                    out.push_str(version);
                    rest = &tail[close + 1..];
                }
                "provider" => {
                    out.push_str(provider);
                    rest = &tail[close + 1..];
                }
                _ => {
                    // Not one of ours; emit the brace and keep scanning after it
                    out.push('{');
                    rest = &tail[1..];
                }
            },
            None => {
                // Unterminated brace, nothing left to substitute
                out.push_str(tail);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
