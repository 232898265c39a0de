use std::net::{IpAddr, Ipv6Addr};

pub const MAX_EMAIL_LENGTH: usize = 254;

const ATEXT_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("This field may not be blank.")]
    Blank,
    #[error("Ensure this value has at most 254 characters.")]
    TooLong,
    #[error("Enter a valid email address.")]
    Invalid,
}

/// Checks address syntax: a dot-atom or quoted local part, then a hostname
/// with a real TLD, `localhost`, or a bracketed IP literal.
pub fn validate_email(value: &str) -> Result<(), EmailError> {
    if value.is_empty() {
        return Err(EmailError::Blank);
    }
    if value.chars().count() > MAX_EMAIL_LENGTH {
        return Err(EmailError::TooLong);
    }

    let (local, domain) = value.rsplit_once('@').ok_or(EmailError::Invalid)?;

    if !is_valid_local_part(local) {
        return Err(EmailError::Invalid);
    }

    if is_valid_domain(domain) {
        return Ok(());
    }

    if !domain.is_ascii() {
        if let Ok(url::Host::Domain(ascii)) = url::Host::parse(domain) {
            if is_valid_domain(&ascii) {
                return Ok(());
            }
        }
    }

    Err(EmailError::Invalid)
}

fn is_atext(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(ch)
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() {
        return false;
    }

    if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        return is_valid_quoted_string(&local[1..local.len() - 1]);
    }

    local
        .split('.')
        .all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn is_valid_quoted_string(inner: &str) -> bool {
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) if escaped.is_ascii() && !matches!(escaped, '\0' | '\n' | '\r') => {}
                _ => return false,
            },
            '"' => return false,
            ch if ch.is_ascii() && !matches!(ch, '\0' | '\t' | '\n' | '\r') => {}
            _ => return false,
        }
    }
    true
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }

    if let Some(literal) = domain
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return is_valid_ip_literal(literal);
    }

    let Some((hosts, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    is_valid_tld(tld) && hosts.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

fn is_valid_tld(tld: &str) -> bool {
    (2..=63).contains(&tld.len())
        && tld
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        && !tld.ends_with('-')
}

fn is_valid_ip_literal(literal: &str) -> bool {
    if let Some(v6) = literal
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("ipv6:"))
        .map(|_| &literal[5..])
    {
        return v6.parse::<Ipv6Addr>().is_ok();
    }
    literal.parse::<IpAddr>().is_ok()
}
