//! Process listing passthrough.
//!
//! `ps auxww` output is forwarded almost verbatim: the header is dropped
//! and each row is split into at most eleven fields so the command line,
//! which may itself contain whitespace, survives as the final field.
//! Nothing here is interpreted numerically.

/// One `ps` row, command line kept whole in the last field.
pub type ProcessRow = Vec<String>;

/// Splits `ps auxww`-shaped text into rows, dropping the header line.
pub fn parse_process_list(text: &str) -> Vec<ProcessRow> {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| split_limit(line, 11))
        .collect()
}

/// Splits on whitespace runs into at most `max_fields` fields; the final
/// field carries the untouched remainder of the line.
fn split_limit(line: &str, max_fields: usize) -> Vec<String> {
    let mut fields = Vec::new();
    let mut rest = line.trim_start();
    while fields.len() + 1 < max_fields {
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
                if rest.is_empty() {
                    return fields;
                }
            }
            None => {
                if !rest.is_empty() {
                    fields.push(rest.to_string());
                }
                return fields;
            }
        }
    }
    fields.push(rest.trim_end().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS: &str = "\
USER       PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
root         1  0.0  0.1 168964 11972 ?        Ss   Jan01   1:23 /sbin/init splash
postgres  4242  1.5  2.0 321000 84000 ?        Ss   10:00   0:42 postgres: walwriter

www       9001  0.2  0.5  55000 21000 ?        S    10:05   0:01 nginx: worker process
";

    #[test]
    fn header_and_blank_lines_are_dropped() {
        let rows = parse_process_list(PS);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "root");
        assert_eq!(rows[2][0], "www");
    }

    #[test]
    fn command_with_spaces_stays_one_field() {
        let rows = parse_process_list(PS);
        assert_eq!(rows[0].len(), 11);
        assert_eq!(rows[0][10], "/sbin/init splash");
        assert_eq!(rows[1][10], "postgres: walwriter");
        assert_eq!(rows[2][10], "nginx: worker process");
    }

    #[test]
    fn short_rows_keep_their_natural_width() {
        let rows = parse_process_list("HEADER\na b c\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"]]);
    }
}
