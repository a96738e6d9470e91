//! Fixed mapping tables from the lookup API's vocabulary to catalog fields.

use placebook_shared::{PlaceType, PriceRange};

/// External price tier → ordinal `$`…`$$$$` symbol.
///
/// Free and unspecified tiers map to nothing rather than guessing.
pub fn map_price_tier(tier: &str) -> Option<PriceRange> {
    match tier {
        "PRICE_LEVEL_INEXPENSIVE" => Some(PriceRange::Inexpensive),
        "PRICE_LEVEL_MODERATE" => Some(PriceRange::Moderate),
        "PRICE_LEVEL_EXPENSIVE" => Some(PriceRange::Expensive),
        "PRICE_LEVEL_VERY_EXPENSIVE" => Some(PriceRange::VeryExpensive),
        _ => None,
    }
}

/// Priority-ordered taxonomy table. First match wins, so dining-related
/// types take precedence over the generic `store` that restaurants often
/// also carry.
const TYPE_PRIORITY: &[(&str, PlaceType)] = &[
    ("restaurant", PlaceType::Dining),
    ("cafe", PlaceType::Dining),
    ("coffee_shop", PlaceType::Dining),
    ("bakery", PlaceType::Dining),
    ("bar", PlaceType::Dining),
    ("meal_takeaway", PlaceType::Dining),
    ("meal_delivery", PlaceType::Dining),
    ("ice_cream_shop", PlaceType::Dining),
    ("food", PlaceType::Dining),
    ("lodging", PlaceType::Accommodation),
    ("hotel", PlaceType::Accommodation),
    ("motel", PlaceType::Accommodation),
    ("bed_and_breakfast", PlaceType::Accommodation),
    ("campground", PlaceType::Accommodation),
    ("rv_park", PlaceType::Accommodation),
    ("tourist_attraction", PlaceType::Activity),
    ("museum", PlaceType::Activity),
    ("park", PlaceType::Activity),
    ("beach", PlaceType::Activity),
    ("hiking_area", PlaceType::Activity),
    ("marina", PlaceType::Activity),
    ("zoo", PlaceType::Activity),
    ("amusement_park", PlaceType::Activity),
    ("art_gallery", PlaceType::Activity),
    ("performing_arts_theater", PlaceType::Activity),
    ("shopping_mall", PlaceType::Shopping),
    ("clothing_store", PlaceType::Shopping),
    ("gift_shop", PlaceType::Shopping),
    ("book_store", PlaceType::Shopping),
    ("grocery_store", PlaceType::Shopping),
    ("market", PlaceType::Shopping),
    ("store", PlaceType::Shopping),
];

/// Map an external type taxonomy to the internal [`PlaceType`].
///
/// Returns `None` when nothing in the taxonomy is recognized, so callers
/// can keep the extractor's type instead of clobbering it with `Other`.
pub fn map_place_type(taxonomy: &[String]) -> Option<PlaceType> {
    for (external, internal) in TYPE_PRIORITY {
        if taxonomy.iter().any(|t| t == external) {
            return Some(*internal);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_tier_table() {
        assert_eq!(
            map_price_tier("PRICE_LEVEL_INEXPENSIVE"),
            Some(PriceRange::Inexpensive)
        );
        assert_eq!(
            map_price_tier("PRICE_LEVEL_VERY_EXPENSIVE"),
            Some(PriceRange::VeryExpensive)
        );
        assert_eq!(map_price_tier("PRICE_LEVEL_FREE"), None);
        assert_eq!(map_price_tier("PRICE_LEVEL_UNSPECIFIED"), None);
        assert_eq!(map_price_tier("garbage"), None);
    }

    #[test]
    fn dining_beats_generic_store() {
        let taxonomy = vec!["store".to_string(), "restaurant".to_string()];
        assert_eq!(map_place_type(&taxonomy), Some(PlaceType::Dining));
    }

    #[test]
    fn store_alone_is_shopping() {
        let taxonomy = vec!["store".to_string(), "point_of_interest".to_string()];
        assert_eq!(map_place_type(&taxonomy), Some(PlaceType::Shopping));
    }

    #[test]
    fn lodging_is_accommodation() {
        let taxonomy = vec!["lodging".to_string()];
        assert_eq!(map_place_type(&taxonomy), Some(PlaceType::Accommodation));
    }

    #[test]
    fn unrecognized_taxonomy_maps_to_none() {
        let taxonomy = vec!["point_of_interest".to_string(), "establishment".to_string()];
        assert_eq!(map_place_type(&taxonomy), None);
    }
}
