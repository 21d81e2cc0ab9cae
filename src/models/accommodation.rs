use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::search::normalize;

/// Category of student residence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResidenceType {
    UniversityResidence,
    SocialResidence,
    YoungWorkersResidence,
    PrivateStudentResidence,
    IntergenerationalHousing,
    MixedResidence,
    #[default]
    Other,
}

impl ResidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResidenceType::UniversityResidence => "university_residence",
            ResidenceType::SocialResidence => "social_residence",
            ResidenceType::YoungWorkersResidence => "young_workers_residence",
            ResidenceType::PrivateStudentResidence => "private_student_residence",
            ResidenceType::IntergenerationalHousing => "intergenerational_housing",
            ResidenceType::MixedResidence => "mixed_residence",
            ResidenceType::Other => "other",
        }
    }

    /// Maps the free-form labels partners use onto a residence type
    pub fn from_label(label: &str) -> Self {
        let label = normalize(label).replace(' ', "_");
        if let Some(exact) = Self::all().into_iter().find(|t| t.as_str() == label) {
            return exact;
        }

        let label = label.replace('_', " ");
        if label.contains("crous") || label.contains("universitaire") {
            ResidenceType::UniversityResidence
        } else if label.contains("jeunes travailleurs") || label.contains("fjt") {
            ResidenceType::YoungWorkersResidence
        } else if label.contains("intergenerationnel") {
            ResidenceType::IntergenerationalHousing
        } else if label.contains("mixte") {
            ResidenceType::MixedResidence
        } else if label.contains("sociale") || label.contains("hlm") {
            ResidenceType::SocialResidence
        } else if label.contains("privee") || label.contains("service") {
            ResidenceType::PrivateStudentResidence
        } else {
            ResidenceType::Other
        }
    }

    fn all() -> [ResidenceType; 7] {
        [
            ResidenceType::UniversityResidence,
            ResidenceType::SocialResidence,
            ResidenceType::YoungWorkersResidence,
            ResidenceType::PrivateStudentResidence,
            ResidenceType::IntergenerationalHousing,
            ResidenceType::MixedResidence,
            ResidenceType::Other,
        ]
    }
}

/// Apartment layouts, from studio to seven rooms and more
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApartmentType {
    T1,
    T1Bis,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7More,
}

impl ApartmentType {
    pub const ALL: [ApartmentType; 8] = [
        ApartmentType::T1,
        ApartmentType::T1Bis,
        ApartmentType::T2,
        ApartmentType::T3,
        ApartmentType::T4,
        ApartmentType::T5,
        ApartmentType::T6,
        ApartmentType::T7More,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApartmentType::T1 => "t1",
            ApartmentType::T1Bis => "t1_bis",
            ApartmentType::T2 => "t2",
            ApartmentType::T3 => "t3",
            ApartmentType::T4 => "t4",
            ApartmentType::T5 => "t5",
            ApartmentType::T6 => "t6",
            ApartmentType::T7More => "t7_more",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|t| t.as_str() == key)
    }
}

/// Stock, availability and advertised rent range for one apartment type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitStock {
    pub total: Option<u32>,
    pub available: Option<u32>,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Amenities {
    pub laundry_room: bool,
    pub common_areas: bool,
    pub bike_storage: bool,
    pub parking: bool,
    pub secure_access: bool,
    pub residence_manager: bool,
    pub kitchen_type: Option<String>,
    pub desk: bool,
    pub cooking_plates: bool,
    pub microwave: bool,
    pub refrigerator: bool,
    pub bathroom: Option<String>,
}

/// A published or draft student housing listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Accommodation {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub point: Option<GeoPoint>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub residence_type: ResidenceType,
    pub owner_id: Option<i64>,
    pub units: BTreeMap<ApartmentType, UnitStock>,
    pub nb_total_apartments: Option<u32>,
    pub nb_accessible_apartments: Option<u32>,
    pub nb_coliving_apartments: Option<u32>,
    pub amenities: Amenities,
    pub images_urls: Vec<String>,
    pub external_url: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Accommodation {
    /// The sixteen advertised price fields, min then max per apartment type
    pub fn price_fields(&self) -> [Option<u32>; 16] {
        let mut fields = [None; 16];
        for (i, kind) in ApartmentType::ALL.iter().enumerate() {
            if let Some(stock) = self.units.get(kind) {
                fields[i * 2] = stock.price_min;
                fields[i * 2 + 1] = stock.price_max;
            }
        }
        fields
    }

    /// Available units summed across types, `None` when no type reports one
    pub fn available_units(&self) -> Option<u32> {
        self.units
            .values()
            .filter_map(|stock| stock.available)
            .fold(None, |acc, n| Some(acc.unwrap_or(0u32).saturating_add(n)))
    }
}

/// Insert payload for a listing; slug and timestamps are assigned on save
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewAccommodation {
    pub name: String,
    pub description: Option<String>,
    pub point: Option<GeoPoint>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub residence_type: ResidenceType,
    pub owner_id: Option<i64>,
    pub units: BTreeMap<ApartmentType, UnitStock>,
    pub nb_total_apartments: Option<u32>,
    pub nb_accessible_apartments: Option<u32>,
    pub nb_coliving_apartments: Option<u32>,
    pub amenities: Amenities,
    pub images_urls: Vec<String>,
    pub external_url: Option<String>,
    pub published: bool,
}

/// Partial update: only `Some` fields are written
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccommodationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub point: Option<GeoPoint>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub residence_type: Option<ResidenceType>,
    /// Replaces the stock of the listed apartment types, others are kept
    pub units: Option<BTreeMap<ApartmentType, UnitStock>>,
    pub nb_total_apartments: Option<u32>,
    pub nb_accessible_apartments: Option<u32>,
    pub nb_coliving_apartments: Option<u32>,
    pub amenities: Option<Amenities>,
    pub images_urls: Option<Vec<String>>,
    pub external_url: Option<String>,
    pub published: Option<bool>,
}

impl AccommodationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, target: &mut Accommodation) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field { target.$field = value; })*
            };
        }
        macro_rules! set_opt {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field { target.$field = Some(value); })*
            };
        }

        set!(name, address, city, postal_code, residence_type, amenities, images_urls, published);
        set_opt!(
            description,
            point,
            nb_total_apartments,
            nb_accessible_apartments,
            nb_coliving_apartments,
            external_url
        );
        if let Some(units) = self.units {
            target.units.extend(units);
        }
    }
}

impl From<NewAccommodation> for AccommodationPatch {
    fn from(new: NewAccommodation) -> Self {
        Self {
            name: Some(new.name),
            description: new.description,
            point: new.point,
            address: Some(new.address),
            city: Some(new.city),
            postal_code: Some(new.postal_code),
            residence_type: Some(new.residence_type),
            units: Some(new.units),
            nb_total_apartments: new.nb_total_apartments,
            nb_accessible_apartments: new.nb_accessible_apartments,
            nb_coliving_apartments: new.nb_coliving_apartments,
            amenities: Some(new.amenities),
            images_urls: (!new.images_urls.is_empty()).then_some(new.images_urls),
            external_url: new.external_url,
            published: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Accommodation {
        Accommodation {
            id: 1,
            slug: "residence-test".into(),
            name: "Résidence Test".into(),
            description: None,
            point: None,
            address: "1 rue de la Paix".into(),
            city: "Paris".into(),
            postal_code: "75002".into(),
            residence_type: ResidenceType::UniversityResidence,
            owner_id: None,
            units: BTreeMap::new(),
            nb_total_apartments: None,
            nb_accessible_apartments: None,
            nb_coliving_apartments: None,
            amenities: Amenities::default(),
            images_urls: vec![],
            external_url: None,
            published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_residence_type_from_label() {
        assert_eq!(
            ResidenceType::from_label("Résidence Universitaire conventionnée"),
            ResidenceType::UniversityResidence
        );
        assert_eq!(
            ResidenceType::from_label("Foyer Jeunes Travailleurs"),
            ResidenceType::YoungWorkersResidence
        );
        assert_eq!(
            ResidenceType::from_label("social_residence"),
            ResidenceType::SocialResidence
        );
        assert_eq!(ResidenceType::from_label("Chambre chez l'habitant"), ResidenceType::Other);
    }

    #[test]
    fn test_apartment_type_from_key() {
        assert_eq!(ApartmentType::from_key("T1-bis"), Some(ApartmentType::T1Bis));
        assert_eq!(ApartmentType::from_key("t7_more"), Some(ApartmentType::T7More));
        assert_eq!(ApartmentType::from_key("t8"), None);
    }

    #[test]
    fn test_price_fields_follow_type_order() {
        let mut acc = sample();
        acc.units.insert(
            ApartmentType::T2,
            UnitStock {
                price_min: Some(400),
                price_max: Some(520),
                ..Default::default()
            },
        );
        let fields = acc.price_fields();
        assert_eq!(fields[4], Some(400));
        assert_eq!(fields[5], Some(520));
        assert_eq!(fields.iter().flatten().count(), 2);
    }

    #[test]
    fn test_available_units() {
        let mut acc = sample();
        assert_eq!(acc.available_units(), None);

        acc.units.insert(ApartmentType::T1, UnitStock { available: Some(0), ..Default::default() });
        assert_eq!(acc.available_units(), Some(0));

        acc.units.insert(ApartmentType::T2, UnitStock { available: Some(3), ..Default::default() });
        acc.units.insert(ApartmentType::T3, UnitStock { total: Some(10), ..Default::default() });
        assert_eq!(acc.available_units(), Some(3));
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut acc = sample();
        acc.units.insert(ApartmentType::T1, UnitStock { total: Some(5), ..Default::default() });

        let mut units = BTreeMap::new();
        units.insert(ApartmentType::T2, UnitStock { total: Some(2), ..Default::default() });
        AccommodationPatch {
            name: Some("Nouveau nom".into()),
            nb_accessible_apartments: Some(4),
            units: Some(units),
            ..Default::default()
        }
        .apply(&mut acc);

        assert_eq!(acc.name, "Nouveau nom");
        assert_eq!(acc.city, "Paris");
        assert_eq!(acc.nb_accessible_apartments, Some(4));
        assert_eq!(acc.units.len(), 2);
        assert!(acc.published);
    }

    #[test]
    fn test_empty_patch() {
        assert!(AccommodationPatch::default().is_empty());
        assert!(!AccommodationPatch { published: Some(false), ..Default::default() }.is_empty());
    }
}
