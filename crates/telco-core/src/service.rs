//! Services sold to customers and the cable media that carry them.

use serde::{Deserialize, Serialize};

/// A service a company can sell to a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Service {
    Phone,
    Television,
    Broadband,
}

impl Service {
    pub fn all() -> [Service; 3] {
        [Service::Phone, Service::Television, Service::Broadband]
    }

    fn bit(self) -> u8 {
        match self {
            Service::Phone => 1,
            Service::Television => 1 << 1,
            Service::Broadband => 1 << 2,
        }
    }
}

/// A compact set of [`Service`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceSet(u8);

impl ServiceSet {
    pub const EMPTY: ServiceSet = ServiceSet(0);
    pub const ALL: ServiceSet = ServiceSet(0b111);

    pub fn of(services: &[Service]) -> Self {
        services.iter().copied().collect()
    }

    pub fn contains(self, service: Service) -> bool {
        self.0 & service.bit() != 0
    }

    pub fn insert(&mut self, service: Service) {
        self.0 |= service.bit();
    }

    pub fn remove(&mut self, service: Service) {
        self.0 &= !service.bit();
    }

    pub fn union(self, other: ServiceSet) -> ServiceSet {
        ServiceSet(self.0 | other.0)
    }

    pub fn intersection(self, other: ServiceSet) -> ServiceSet {
        ServiceSet(self.0 & other.0)
    }

    pub fn difference(self, other: ServiceSet) -> ServiceSet {
        ServiceSet(self.0 & !other.0)
    }

    pub fn is_superset(self, other: ServiceSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> u32 {
        (self.0 & Self::ALL.0).count_ones()
    }

    /// Members in [`Service::all`] order.
    pub fn iter(self) -> impl Iterator<Item = Service> {
        Service::all().into_iter().filter(move |s| self.contains(*s))
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl FromIterator<Service> for ServiceSet {
    fn from_iter<I: IntoIterator<Item = Service>>(iter: I) -> Self {
        let mut set = ServiceSet::EMPTY;
        for s in iter {
            set.insert(s);
        }
        set
    }
}

/// Physical medium of a cable or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CableType {
    Copper,
    Coaxial,
    Optical,
}

impl CableType {
    /// Services the medium is physically able to carry.
    pub fn services(self) -> ServiceSet {
        match self {
            CableType::Copper => ServiceSet::of(&[Service::Phone, Service::Broadband]),
            CableType::Coaxial | CableType::Optical => ServiceSet::ALL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let mut set = ServiceSet::EMPTY;
        assert!(set.is_empty());
        set.insert(Service::Phone);
        set.insert(Service::Broadband);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Service::Phone));
        assert!(!set.contains(Service::Television));
        set.remove(Service::Phone);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Service::Broadband]);
    }

    #[test]
    fn set_algebra() {
        let a = ServiceSet::of(&[Service::Phone, Service::Television]);
        let b = ServiceSet::of(&[Service::Television, Service::Broadband]);
        assert_eq!(a.union(b), ServiceSet::ALL);
        assert_eq!(a.intersection(b), ServiceSet::of(&[Service::Television]));
        assert_eq!(a.difference(b), ServiceSet::of(&[Service::Phone]));
        assert!(ServiceSet::ALL.is_superset(a));
        assert!(!a.is_superset(b));
    }

    #[test]
    fn cable_type_services() {
        let copper = CableType::Copper.services();
        assert!(copper.contains(Service::Phone));
        assert!(copper.contains(Service::Broadband));
        assert!(!copper.contains(Service::Television));
        assert_eq!(CableType::Coaxial.services(), ServiceSet::ALL);
        assert_eq!(CableType::Optical.services(), ServiceSet::ALL);
    }

    #[test]
    fn service_set_serializes_as_bits() {
        let set = ServiceSet::of(&[Service::Phone, Service::Broadband]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "5");
    }
}
