use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Ref, X509};
use std::collections::{HashMap, HashSet};

// Best-effort chain ordering: pick a likely leaf (subject not used as issuer) and
// follow issuer->subject links until a self-signed root or a gap. Certificates
// off that path are returned separately as unrelated.

pub struct OrderedChain {
    /// Leaf first, each certificate followed by its issuer.
    pub chain: Vec<X509>,
    /// Provided certificates that are not on the leaf's issuer path.
    pub unrelated: Vec<X509>,
    /// Exact duplicates removed from the input.
    pub duplicates: Vec<X509>,
    /// True when the input listed the path certificates in a different order.
    pub reordered: bool,
}

fn name_der(name: &openssl::x509::X509NameRef) -> Vec<u8> {
    name.to_der().unwrap_or_default()
}

fn fingerprint(cert: &X509Ref) -> Vec<u8> {
    cert.digest(MessageDigest::sha256())
        .map(|d| d.to_vec())
        .unwrap_or_else(|_| cert.to_der().unwrap_or_default())
}

/// Order `certs` leaf-first. When several certificates could be the leaf, the one
/// whose public key matches `key` is preferred. `certs` must not be empty.
pub fn order_chain_leaf_to_root(certs: &[X509], key: Option<&PKey<Private>>) -> OrderedChain {
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut all: Vec<&X509> = Vec::new();
    let mut duplicates: Vec<X509> = Vec::new();
    for c in certs {
        if seen.insert(fingerprint(c)) {
            all.push(c);
        } else {
            duplicates.push(c.clone());
        }
    }

    let mut by_subject: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();
    for (i, c) in all.iter().enumerate() {
        by_subject.entry(name_der(c.subject_name())).or_default().push(i);
    }
    // Self-issued certificates do not disqualify themselves from being a leaf.
    let issuer_subjects: HashSet<Vec<u8>> = all
        .iter()
        .filter(|c| name_der(c.issuer_name()) != name_der(c.subject_name()))
        .map(|c| name_der(c.issuer_name()))
        .collect();
    let candidates: Vec<usize> = (0..all.len())
        .filter(|&i| !issuer_subjects.contains(&name_der(all[i].subject_name())))
        .collect();
    let key_matches = |i: usize| match (key, all[i].public_key()) {
        (Some(k), Ok(pk)) => pk.public_eq(k),
        _ => false,
    };
    let leaf = candidates
        .iter()
        .copied()
        .find(|&i| key_matches(i))
        .or_else(|| candidates.first().copied())
        .or_else(|| (0..all.len()).find(|&i| key_matches(i)))
        .unwrap_or(0);

    let mut path: Vec<usize> = vec![leaf];
    let mut current = leaf;
    loop {
        let issuer = name_der(all[current].issuer_name());
        if issuer == name_der(all[current].subject_name()) { break; }
        let next = by_subject
            .get(&issuer)
            .and_then(|v| v.iter().copied().find(|i| !path.contains(i)));
        match next {
            Some(n) => {
                path.push(n);
                current = n;
            }
            None => break,
        }
    }

    let reordered = path.windows(2).any(|w| w[0] > w[1]);
    let unrelated = (0..all.len())
        .filter(|i| !path.contains(i))
        .map(|i| all[i].clone())
        .collect();
    OrderedChain {
        chain: path.into_iter().map(|i| all[i].clone()).collect(),
        unrelated,
        duplicates,
        reordered,
    }
}
