use fnv::FnvHashMap;

use crate::config::Scale;
use crate::error::Result;
use crate::store::RatingStore;

/// Maps the string identifiers of the input to consecutive integer ids, in the order in which
/// users and items are first seen.
pub struct DataDictionary {
    user_dict: FnvHashMap<String, u32>,
    item_dict: FnvHashMap<String, u32>,
    num_ratings: u64,
}

impl DataDictionary {

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    pub fn user_index(&self, name: &str) -> Option<u32> {
        self.user_dict.get(name).cloned()
    }

    pub fn item_index(&self, name: &str) -> Option<u32> {
        self.item_dict.get(name).cloned()
    }
}

impl DataDictionary {

    pub fn new() -> Self {
        DataDictionary {
            user_dict: FnvHashMap::with_capacity_and_hasher(100, Default::default()),
            item_dict: FnvHashMap::with_capacity_and_hasher(100, Default::default()),
            num_ratings: 0,
        }
    }

    /// Integer ids of a user and an item, assigning new ones for names not seen before.
    pub fn index(&mut self, user: &str, item: &str) -> (u32, u32) {
        (assign(&mut self.user_dict, user), assign(&mut self.item_dict, item))
    }

    /// Reads all ratings into a store, renaming users and items on the way. The first rejected
    /// record aborts the read.
    pub fn build_store<I>(ratings: I, scale: Scale, strict: bool) -> Result<(Self, RatingStore)>
        where I: IntoIterator<Item=Result<(String, String, f64)>> {

        let mut data_dict = DataDictionary::new();
        let mut store = RatingStore::new(scale, strict);

        for rating in ratings {
            let (user, item, value) = rating?;
            let (user_index, item_index) = data_dict.index(&user, &item);
            let is_new = store.get(user_index, item_index).is_none();
            store.put(user_index, item_index, value)?;
            if is_new {
                data_dict.num_ratings += 1;
            }
        }

        Ok((data_dict, store))
    }
}

impl Default for DataDictionary {
    fn default() -> Self {
        DataDictionary::new()
    }
}

fn assign(dict: &mut FnvHashMap<String, u32>, name: &str) -> u32 {
    if let Some(index) = dict.get(name) {
        return *index;
    }

    let index = dict.len() as u32;
    dict.insert(name.to_string(), index);
    index
}
