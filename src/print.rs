use anyhow::Result;
use openssl::pkey::Id as KeyId;
use openssl::x509::{X509Ref, X509};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::doctor::Warning;
use crate::platform::CertificateRecord;
use crate::util::{ec_curve_name, fingerprint_sha256, name_items};

pub fn print_bold(out: &mut dyn WriteColor, text: &str) -> Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{}", text)?;
    out.reset()?;
    Ok(())
}

fn print_field(out: &mut dyn WriteColor, indent: &str, label: &str, value: &str) -> Result<()> {
    write!(out, "{}", indent)?;
    print_bold(out, &format!("{}:", label))?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)))?;
    write!(out, " {}", value)?;
    out.reset()?;
    writeln!(out)?;
    Ok(())
}

/// Summary after a successful upload: where the app is served, what the platform
/// recorded, the chain that was sent, then every warning.
pub fn report_upload(
    out: &mut dyn WriteColor,
    app: &str,
    record: &CertificateRecord,
    uploaded_pem: &str,
    warnings: &[Warning],
) -> Result<()> {
    writeln!(out, "{} now served by {}", app, record.cname)?;
    if let Some(ssl) = &record.ssl_cert {
        writeln!(out, "Certificate details:")?;
        if !ssl.cert_domains.is_empty() {
            print_field(out, "", "Common Name(s)", &ssl.cert_domains.join(", "))?;
        }
        if let Some(v) = &ssl.expires_at { print_field(out, "", "Expires At", v)?; }
        if let Some(v) = &ssl.issuer { print_field(out, "", "Issuer", v)?; }
        if let Some(v) = &ssl.starts_at { print_field(out, "", "Starts At", v)?; }
        if let Some(v) = &ssl.subject { print_field(out, "", "Subject", v)?; }
        if let Some(signed) = ssl.ca_signed {
            let status = if signed { "The certificate is signed by a trusted CA" } else { "The certificate is self signed" };
            print_field(out, "", "SSL certificate is verified by a root authority", status)?;
        }
    }
    // A bypassed bundle may not parse; the chain listing is then omitted.
    if let Ok(chain) = X509::stack_from_pem(uploaded_pem.as_bytes()) {
        if !chain.is_empty() {
            writeln!(out)?;
            writeln!(out, "--- Certificate chain (leaf -> root) ---")?;
            print_chain_with_separator(out, &chain)?;
        }
    }
    print_warnings(out, warnings)?;
    for (field, messages) in &record.warnings {
        for message in messages {
            print_warning_line(out, &format!("{} {}", field, message))?;
        }
    }
    Ok(())
}

/// Render the ordered chain with a simple "is issued by ->" separator for readability.
pub fn print_chain_with_separator(out: &mut dyn WriteColor, seq: &[X509]) -> Result<()> {
    for (i, cert) in seq.iter().enumerate() {
        print_cert_info(out, i + 1, cert)?;
        if i + 1 < seq.len() {
            writeln!(out, "is issued by ->")?;
        }
    }
    Ok(())
}

// Subject/Issuer (selected attributes), validity, key algorithm and size, and a
// SHA-256 fingerprint.
pub fn print_cert_info(out: &mut dyn WriteColor, idx: usize, cert: &X509Ref) -> Result<()> {
    let pkey = cert.public_key()?;
    let alg = match pkey.id() {
        KeyId::RSA => "RSA".to_string(),
        KeyId::EC => format!("EC{}", ec_curve_name(&pkey).map(|c| format!(" ({})", c)).unwrap_or_default()),
        KeyId::ED25519 => "Ed25519".to_string(),
        KeyId::ED448 => "Ed448".to_string(),
        other => format!("{:?}", other),
    };

    writeln!(out, "[{}]", idx)?;
    print_bold(out, "  Subject:")?;
    writeln!(out)?;
    for (label, value) in name_items(cert.subject_name().entries()) {
        print_field(out, "    - ", label, &value)?;
    }
    print_bold(out, "  Issuer:")?;
    writeln!(out)?;
    for (label, value) in name_items(cert.issuer_name().entries()) {
        print_field(out, "    - ", label, &value)?;
    }
    print_field(out, "  ", "Valid", &format!("{} -> {}", cert.not_before(), cert.not_after()))?;
    print_field(out, "  ", "Public Key", &format!("{} {} bits", alg, pkey.bits()))?;
    print_field(out, "  ", "SHA-256 Fingerprint", &fingerprint_sha256(cert)?)?;
    writeln!(out)?;
    Ok(())
}

pub fn print_warnings(out: &mut dyn WriteColor, warnings: &[Warning]) -> Result<()> {
    for warning in warnings {
        print_warning_line(out, &warning.message)?;
    }
    Ok(())
}

fn print_warning_line(out: &mut dyn WriteColor, message: &str) -> Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    write!(out, "WARNING:")?;
    out.reset()?;
    writeln!(out, " {}", message)?;
    Ok(())
}
