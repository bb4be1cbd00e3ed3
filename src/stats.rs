use fnv::FnvHashMap;

use crate::io::RatingRecord;

/// Maps raw user and item identifiers to consecutive inner indices, in order of their first
/// appearance in the rating data.
pub struct DataDictionary {
    user_dict: FnvHashMap<String,u32>,
    item_dict: FnvHashMap<String,u32>,
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

    pub fn item_dict(&self) -> &FnvHashMap<String,u32> {
        &self.item_dict
    }
 }

impl DataDictionary {

    pub fn from_ratings<'a, T>(ratings: T) -> Self where T: IntoIterator<Item=&'a RatingRecord> {

        let mut user_index: u32 = 0;
        let mut user_dict: FnvHashMap<String,u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut item_index: u32 = 0;
        let mut item_dict: FnvHashMap<String,u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut num_ratings: u64 = 0;

        for rating in ratings.into_iter() {

            if !user_dict.contains_key(&rating.user) {
                user_dict.insert(rating.user.clone(), user_index);
                user_index += 1;
            }

            if !item_dict.contains_key(&rating.item) {
                item_dict.insert(rating.item.clone(), item_index);
                item_index += 1;
            }

            num_ratings += 1;
        }

        DataDictionary { user_dict, item_dict, num_ratings }
    }
}


#[cfg(test)]
mod tests {

    use crate::io::RatingRecord;
    use crate::stats::DataDictionary;

    fn rating(user: &str, item: &str, rating: f64) -> RatingRecord {
        RatingRecord { user: user.to_string(), item: item.to_string(), rating }
    }

    #[test]
    fn consecutive_indices_in_order_of_appearance() {
        let ratings = vec![
            rating("alice", "cafe", 4.0),
            rating("bob", "museum", 2.0),
            rating("alice", "museum", 5.0),
            rating("carol", "cafe", 1.0),
        ];

        let data_dict = DataDictionary::from_ratings(&ratings);

        assert_eq!(data_dict.num_users(), 3);
        assert_eq!(data_dict.num_items(), 2);
        assert_eq!(data_dict.num_ratings(), 4);

        assert_eq!(data_dict.user_index("alice"), Some(0));
        assert_eq!(data_dict.user_index("carol"), Some(2));
        assert_eq!(data_dict.item_index("museum"), Some(1));
        assert_eq!(data_dict.item_index("park"), None);
    }
}
