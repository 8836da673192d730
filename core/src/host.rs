//! Uniform random host selection.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CallError;
use crate::service::Service;

/// Pick one of the service's hosts uniformly at random.
///
/// Fails with `NoHostsAvailable` when the list is empty. The random source
/// is passed in so tests can seed it; nothing is remembered between calls.
pub fn choose_host<R: Rng + ?Sized>(service: &dyn Service, rng: &mut R) -> Result<String, CallError> {
    let hosts = service.get_hosts();
    hosts
        .choose(rng)
        .cloned()
        .ok_or_else(|| CallError::NoHostsAvailable {
            service: service.name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::StaticService;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn chooses_a_listed_host() {
        let hosts = ["foo", "bar", "baz"];
        let service = StaticService::new("s", hosts);
        let host = choose_host(&service, &mut rand::thread_rng()).unwrap();
        assert!(hosts.contains(&host.as_str()));
    }

    #[test]
    fn empty_host_list_fails() {
        let service = StaticService::new("empty", Vec::<String>::new());
        let err = choose_host(&service, &mut rand::thread_rng()).unwrap_err();
        assert!(matches!(err, CallError::NoHostsAvailable { service } if service == "empty"));
    }

    #[test]
    fn seeded_source_is_deterministic() {
        let service = StaticService::new("s", ["a", "b", "c", "d"]);
        let first = choose_host(&service, &mut StdRng::seed_from_u64(7)).unwrap();
        let second = choose_host(&service, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn every_host_gets_picked() {
        let service = StaticService::new("s", ["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(choose_host(&service, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    proptest! {
        #[test]
        fn result_is_member(hosts in prop::collection::vec("[a-z]{1,10}", 1..8), seed in any::<u64>()) {
            let service = StaticService::new("s", hosts.clone());
            let host = choose_host(&service, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert!(hosts.contains(&host));
        }
    }
}
