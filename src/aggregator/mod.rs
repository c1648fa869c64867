//! Domain-keyed distinct customer aggregation
//!
//! Architecture: Aggregate Root - DomainRegister owns every (domain, customer) pair seen in a run
//! - Keys are compared by exact string identity, case is never folded here
//! - Memory grows with distinct pairs only, repeated records cost a lookup
//! - Reads are non-destructive so the register can be rendered more than once

#[cfg(feature = "fast-map")]
use hashbrown::{HashMap, HashSet};
#[cfg(not(feature = "fast-map"))]
use std::collections::{HashMap, HashSet};

/// Running mapping of domain to the set of customers seen for it
#[derive(Debug, Clone, Default)]
pub struct DomainRegister {
    domains: HashMap<String, HashSet<String>>,
    distinct_pairs: usize,
}

impl DomainRegister {
    /// Create an empty register
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `customer` was seen at `domain`.
    ///
    /// Returns `true` when the pair is new. Allocates only for new domains or customers.
    pub fn observe(&mut self, domain: &str, customer: &str) -> bool {
        let inserted = match self.domains.get_mut(domain) {
            Some(customers) => {
                if customers.contains(customer) {
                    false
                } else {
                    customers.insert(customer.to_owned())
                }
            }
            None => {
                let mut customers = HashSet::with_capacity(1);
                customers.insert(customer.to_owned());
                self.domains.insert(domain.to_owned(), customers);
                true
            }
        };

        if inserted {
            self.distinct_pairs += 1;
        }
        inserted
    }

    /// Every domain with its distinct customer count, in no particular order
    pub fn snapshot(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.domains
            .iter()
            .map(|(domain, customers)| (domain.as_str(), customers.len()))
    }

    /// Distinct customer count for one exact domain key
    pub fn count(&self, domain: &str) -> Option<usize> {
        self.domains.get(domain).map(|customers| customers.len())
    }

    /// Customers seen for one exact domain key
    pub fn customers(&self, domain: &str) -> Option<impl Iterator<Item = &str> + '_> {
        self.domains
            .get(domain)
            .map(|customers| customers.iter().map(String::as_str))
    }

    /// Number of distinct domain keys
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Total distinct (domain, customer) pairs
    pub fn distinct_pairs(&self) -> usize {
        self.distinct_pairs
    }
}
