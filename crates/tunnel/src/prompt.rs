//! Interactive address prompts.

use std::io::{self, BufRead, Write};
use tunnel_settings::TunnelSettings;

/// Ask for one value, showing `default` in brackets.
///
/// An empty answer keeps `default`. End of input before an answer is an
/// error: the caller cannot tell what the user wanted.
pub fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
) -> io::Result<String> {
    write!(output, "{label} [{default}]: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before an answer was given",
        ));
    }

    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Walk the user through the three tunnel addresses.
pub fn prompt_settings<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    settings: &mut TunnelSettings,
) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, " -----       SOCKS5 TCP tunnel       -----")?;
    writeln!(output)?;
    writeln!(output, " Press Enter to keep the value shown in brackets.")?;
    writeln!(output)?;

    settings.local_addr = prompt(input, output, " Local listen address", &settings.local_addr)?;
    settings.remote_addr = prompt(input, output, " Remote target address", &settings.remote_addr)?;
    settings.socks_addr = prompt(input, output, " SOCKS5 proxy address", &settings.socks_addr)?;

    writeln!(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_returns_answer() {
        let mut input = Cursor::new("10.0.0.1:1080\n");
        let mut output = Vec::new();
        let value = prompt(&mut input, &mut output, "Proxy", "127.0.0.1:1080").unwrap();
        assert_eq!(value, "10.0.0.1:1080");
        assert_eq!(String::from_utf8(output).unwrap(), "Proxy [127.0.0.1:1080]: ");
    }

    #[test]
    fn test_prompt_empty_keeps_default() {
        let mut input = Cursor::new("\n");
        let mut output = Vec::new();
        let value = prompt(&mut input, &mut output, "Proxy", "127.0.0.1:1080").unwrap();
        assert_eq!(value, "127.0.0.1:1080");
    }

    #[test]
    fn test_prompt_trims_whitespace() {
        let mut input = Cursor::new("   host:80 \r\n");
        let mut output = Vec::new();
        let value = prompt(&mut input, &mut output, "Remote", "x:1").unwrap();
        assert_eq!(value, "host:80");
    }

    #[test]
    fn test_prompt_last_line_without_newline() {
        let mut input = Cursor::new("host:80");
        let mut output = Vec::new();
        let value = prompt(&mut input, &mut output, "Remote", "x:1").unwrap();
        assert_eq!(value, "host:80");
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let err = prompt(&mut input, &mut output, "Remote", "x:1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_prompt_settings_mixes_answers_and_defaults() {
        let mut input = Cursor::new("127.0.0.1:2000\n\nproxy.lan:1080\n");
        let mut output = Vec::new();
        let mut settings = TunnelSettings::default();

        prompt_settings(&mut input, &mut output, &mut settings).unwrap();

        assert_eq!(settings.local_addr, "127.0.0.1:2000");
        assert_eq!(settings.remote_addr, "example.com:80");
        assert_eq!(settings.socks_addr, "proxy.lan:1080");

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Remote target address [example.com:80]"));
    }

    #[test]
    fn test_prompt_settings_stops_on_eof() {
        let mut input = Cursor::new("127.0.0.1:2000\n");
        let mut output = Vec::new();
        let mut settings = TunnelSettings::default();
        assert!(prompt_settings(&mut input, &mut output, &mut settings).is_err());
    }
}
