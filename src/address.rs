use crate::err::AddressError;
use mailparse::{addrparse, MailAddr, SingleInfo};

/// Pulls the update token out of a subaddressed recipient.
///
/// `PIF <update+ag5kZXZ@piffer-updates.appspotmail.com>` gives `ag5kZXZ`, as does the bare
/// `update+ag5kZXZ@piffer-updates.appspotmail.com`.
pub fn extract_identifier(address: &str) -> Result<String, AddressError> {
    let addr = match address.split_once('<') {
        Some((_, rest)) => rest.split('>').next().unwrap_or(rest),
        None => address,
    };
    let (_, after_plus) = addr
        .split_once('+')
        .ok_or_else(|| AddressError::NoPlus(address.to_string()))?;
    let (token, _) = after_plus
        .split_once('@')
        .ok_or_else(|| AddressError::NoAt(address.to_string()))?;

    if token.is_empty() {
        return Err(AddressError::Empty(address.to_string()));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AddressError::NotUrlsafe(token.to_string()));
    }
    Ok(token.to_string())
}

/// Like `extract_identifier`, for a whole `To` header: the first subaddressed recipient wins.
pub fn recipient_identifier(to: &str) -> Result<String, AddressError> {
    let list = match addrparse(to) {
        Ok(list) => list,
        Err(_) => return extract_identifier(to),
    };
    let subaddressed = list
        .iter()
        .flat_map(|addr| match addr {
            MailAddr::Single(info) => vec![info],
            MailAddr::Group(group) => group.addrs.iter().collect(),
        })
        .find(|info| info.addr.contains('+'));
    match subaddressed {
        Some(info) => extract_identifier(&info.addr),
        None => extract_identifier(to),
    }
}

pub fn parse_addr(addr: &str) -> Result<SingleInfo, AddressError> {
    let unparseable = || AddressError::Unparseable(addr.to_string());
    let mut parsed = addrparse(addr).map_err(|_| unparseable())?;
    if parsed.is_empty() {
        return Err(unparseable());
    }
    match parsed.remove(0) {
        MailAddr::Single(x) => Ok(x),
        MailAddr::Group(mut xs) if !xs.addrs.is_empty() => Ok(xs.addrs.remove(0)),
        MailAddr::Group(_) => Err(unparseable()),
    }
}

/// Whether `sender` is one of `admins`, ignoring case and display names.
pub fn is_admin(admins: &[String], sender: &str) -> bool {
    let addr = match parse_addr(sender) {
        Ok(info) => info.addr,
        Err(_) => return false,
    };
    admins.iter().any(|admin| admin.trim().eq_ignore_ascii_case(&addr))
}
