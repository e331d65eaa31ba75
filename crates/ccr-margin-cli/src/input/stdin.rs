use std::io::{self, Read};

/// Request body piped into `ccrm`, or None when stdin is a terminal or the
/// pipe carried only whitespace.
pub fn read_piped() -> io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut body = String::new();
    io::stdin().lock().read_to_string(&mut body)?;
    Ok(Some(body).filter(|b| !b.trim().is_empty()))
}
