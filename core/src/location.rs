use crate::pdu::NotificationInd;
use std::collections::{HashSet, VecDeque};

/// Délimiteur après lequel le transaction-id est ajouté
pub const APPEND_DELIMITER: u8 = b'=';

/// Content-location effectif d'une notification
///
/// Si `append_transaction_id` est actif et que le content-location se termine
/// par '=', le transaction-id est concaténé sans séparateur. Sinon le
/// content-location est rendu tel quel.
pub fn effective_content_location(ind: &NotificationInd, append_transaction_id: bool) -> Vec<u8> {
    use crate::pdu::Pdu;

    let location = ind.content_location().unwrap_or_default();
    append_transaction_id_to(location, ind.transaction_id(), append_transaction_id)
}

/// Variante sur octets bruts de `effective_content_location`
pub fn append_transaction_id_to(
    location: &[u8],
    transaction_id: Option<&[u8]>,
    append: bool,
) -> Vec<u8> {
    match (append, location.last(), transaction_id) {
        (true, Some(&APPEND_DELIMITER), Some(tid)) => {
            let mut out = Vec::with_capacity(location.len() + tid.len());
            out.extend_from_slice(location);
            out.extend_from_slice(tid);
            out
        }
        _ => location.to_vec(),
    }
}

/// Vrai si la notification a déjà été vue
pub fn is_duplicate(location: &str, known_locations: &HashSet<String>) -> bool {
    known_locations.contains(location)
}

/// Mémoire des content-locations déjà téléchargés, fournie par l'appelant
pub trait DedupStore {
    fn contains(&self, location: &str) -> bool;

    /// Enregistre un location ; faux s'il était déjà connu
    fn insert(&mut self, location: String) -> bool;
}

impl DedupStore for HashSet<String> {
    fn contains(&self, location: &str) -> bool {
        is_duplicate(location, self)
    }

    fn insert(&mut self, location: String) -> bool {
        HashSet::insert(self, location)
    }
}

/// Mémoire bornée : les locations les plus anciens sont oubliés (FIFO)
#[derive(Debug, Clone)]
pub struct BoundedDedupStore {
    capacity: usize,
    order: VecDeque<String>,
    known: HashSet<String>,
}

impl BoundedDedupStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            known: HashSet::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl DedupStore for BoundedDedupStore {
    fn contains(&self, location: &str) -> bool {
        is_duplicate(location, &self.known)
    }

    fn insert(&mut self, location: String) -> bool {
        if self.known.contains(&location) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.known.remove(&oldest);
            }
        }
        self.known.insert(location.clone());
        self.order.push_back(location);
        true
    }
}
