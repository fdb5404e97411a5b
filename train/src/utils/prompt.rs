use crate::common::*;

/// Asks a yes/no question on the terminal.
///
/// An empty answer picks the default. Other answers are asked again.
pub fn query_yes_no<R, W>(question: &str, default: bool, input: R, mut output: W) -> Result<bool>
where
    R: BufRead,
    W: Write,
{
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let mut lines = input.lines();

    loop {
        write!(output, "{} {} ", question, hint)?;
        output.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => return Ok(default),
        };

        match line.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "ye" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please respond with 'yes' or 'no' (or 'y' or 'n').")?,
        }
    }
}

/// Asks a yes/no question on stdin/stdout.
pub fn query_yes_no_stdin(question: &str, default: bool) -> Result<bool> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    query_yes_no(question, default, stdin.lock(), stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_answers() -> Result<()> {
        let ask = |answers: &str, default| {
            query_yes_no("Log?", default, answers.as_bytes(), io::sink())
        };

        assert!(!ask("\n", false)?);
        assert!(ask("\n", true)?);
        assert!(ask("YES\n", false)?);
        assert!(!ask("n\n", true)?);
        assert!(ask("maybe\ny\n", false)?);
        assert!(!ask("", false)?);
        Ok(())
    }
}
