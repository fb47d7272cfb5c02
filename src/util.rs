use anyhow::Result;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::Id as KeyId;
use openssl::x509::{X509NameEntries, X509NameRef, X509Ref};

const NAME_ORDER: [Nid; 6] = [
    Nid::COMMONNAME,
    Nid::ORGANIZATIONNAME,
    Nid::ORGANIZATIONALUNITNAME,
    Nid::COUNTRYNAME,
    Nid::STATEORPROVINCENAME,
    Nid::LOCALITYNAME,
];

fn name_label(nid: Nid) -> &'static str {
    match nid {
        Nid::COMMONNAME => "Common Name",
        Nid::ORGANIZATIONNAME => "Organization",
        Nid::ORGANIZATIONALUNITNAME => "Organizational Unit",
        Nid::COUNTRYNAME => "Country",
        Nid::STATEORPROVINCENAME => "State/Province",
        Nid::LOCALITYNAME => "Locality",
        _ => "Other",
    }
}

/// Extract a subset of X.509 name attributes and map them to human labels
/// in a consistent order for display.
pub fn name_items(entries: X509NameEntries<'_>) -> Vec<(&'static str, String)> {
    let parts: Vec<(Nid, String)> = entries
        .filter_map(|e| {
            let nid = e.object().nid();
            if !NAME_ORDER.contains(&nid) {
                return None;
            }
            std::str::from_utf8(e.data().as_slice()).ok().map(|v| (nid, v.to_string()))
        })
        .collect();
    let mut out = Vec::new();
    for nid in NAME_ORDER {
        for (n, v) in &parts {
            if *n == nid {
                out.push((name_label(nid), v.clone()));
            }
        }
    }
    out
}

/// Render a compact single-line subject/issuer snippet; used in warnings and errors.
pub fn format_name_human(name: &X509NameRef) -> String {
    let out = name_items(name.entries())
        .into_iter()
        .map(|(label, v)| format!("{}={}", label, v))
        .collect::<Vec<_>>()
        .join(", ");
    if out.is_empty() {
        "<unknown subject>".to_string()
    } else {
        out
    }
}

/// Short label for a certificate: `CN=...` when present, otherwise the full subject.
pub fn cert_label(cert: &X509Ref) -> String {
    subject_cn(cert)
        .map(|cn| format!("CN={}", cn))
        .unwrap_or_else(|| format_name_human(cert.subject_name()))
}

/// Return a colon-separated SHA-256 fingerprint (uppercase hex).
pub fn fingerprint_sha256(cert: &X509Ref) -> Result<String> {
    let d = cert.digest(MessageDigest::sha256())?;
    Ok(d.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Try to get the named curve for EC public keys (short or long name).
pub fn ec_curve_name(pkey: &openssl::pkey::PKeyRef<openssl::pkey::Public>) -> Option<String> {
    if pkey.id() != KeyId::EC { return None; }
    let ec_key = pkey.ec_key().ok()?;
    let nid = ec_key.group().curve_name()?;
    if let Ok(sn) = nid.short_name() { return Some(sn.to_string()); }
    if let Ok(ln) = nid.long_name() { return Some(ln.to_string()); }
    Some(format!("NID({})", nid.as_raw()))
}

/// Convenience: extract Subject Common Name (CN) if present.
pub fn subject_cn(cert: &X509Ref) -> Option<String> {
    first_cn(cert.subject_name())
}

/// Convenience: extract Issuer Common Name (CN) if present.
pub fn issuer_cn(cert: &X509Ref) -> Option<String> {
    first_cn(cert.issuer_name())
}

fn first_cn(name: &X509NameRef) -> Option<String> {
    name.entries_by_nid(Nid::COMMONNAME)
        .find_map(|e| std::str::from_utf8(e.data().as_slice()).ok().map(str::to_string))
}

pub fn is_self_issued(cert: &X509Ref) -> bool {
    cert.subject_name().to_der().ok() == cert.issuer_name().to_der().ok()
}

/// DNS names the certificate covers: SAN dNSName entries, or the subject CN when no SAN exists.
pub fn dns_names(cert: &X509Ref) -> Vec<String> {
    let sans: Vec<String> = cert
        .subject_alt_names()
        .map(|names| names.iter().filter_map(|n| n.dnsname().map(str::to_string)).collect())
        .unwrap_or_default();
    if !sans.is_empty() {
        return sans;
    }
    subject_cn(cert).into_iter().collect()
}

/// Hostname match with a single left-most wildcard label (`*.example.com`).
pub fn hostname_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    match pattern.strip_prefix("*.") {
        Some(suffix) => match host.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest == suffix,
            None => false,
        },
        None => pattern == host,
    }
}
