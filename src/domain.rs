//! Merging of domains and auxiliary domains across sibling nodes.
use crate::error::{Error, Result};
use crate::symbol::Symbol;
use std::collections::BTreeMap;

/// Auxiliary domains, keyed by level (e.g. `"secondary"`).
///
/// An empty domain list means that the level is unset.
pub type AuxiliaryDomains = BTreeMap<String, Vec<String>>;

/// Concatenates the domains of the children in child order.
///
/// Fails if the domain of a child intersects the domains accumulated so far.
pub fn merge_domains<'a>(children: impl IntoIterator<Item = &'a Symbol>) -> Result<Vec<String>> {
    let mut domain: Vec<String> = Vec::new();
    for child in children {
        if let Some(overlap) = child.domain().iter().find(|d| domain.contains(d)) {
            return Err(Error::DomainConflict(format!(
                "domain of children must be disjoint, but `{}` appears more than once",
                overlap
            )));
        }
        domain.extend(child.domain().iter().cloned());
    }
    Ok(domain)
}

/// Combines the auxiliary domains of the children at every level.
///
/// The merged value of a level is the first non-empty value among the children. Two children
/// with different non-empty values for the same level are in conflict.
pub fn merge_auxiliary_domains<'a>(children: impl IntoIterator<Item = &'a Symbol>) -> Result<AuxiliaryDomains> {
    let mut merged = AuxiliaryDomains::new();
    for child in children {
        for (level, child_domain) in child.auxiliary_domains() {
            match merged.get(level) {
                Some(existing) if !existing.is_empty() && !child_domain.is_empty() && existing != child_domain => {
                    return Err(Error::DomainConflict(format!(
                        "children must have same or empty auxiliary domains at level `{}`, not {:?} and {:?}",
                        level, existing, child_domain
                    )));
                }
                Some(existing) if !existing.is_empty() => {}
                _ => {
                    merged.insert(level.clone(), child_domain.clone());
                }
            }
        }
    }
    Ok(merged)
}

/// Sorts the domains according to their position in `domain_order`.
pub(crate) fn sort_by_domain_order(domain: &mut [String], domain_order: &[String]) -> Result<()> {
    for d in domain.iter() {
        if !domain_order.contains(d) {
            return Err(Error::UnknownDomain(d.clone()));
        }
    }
    domain.sort_by_key(|d| domain_order.iter().position(|o| o == d));
    Ok(())
}
