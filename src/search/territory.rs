use std::cmp::Ordering;

use serde::Serialize;

use super::normalize::{normalize, trigram_similarity};
use crate::models::{Academy, City, Department};

pub const DEFAULT_LIMIT: usize = 10;

/// Token rank never outranks an exact or prefix match
const TOKEN_RANK_WEIGHT: f64 = 0.6;
/// `pg_trgm` default similarity threshold
const TRIGRAM_THRESHOLD: f64 = 0.3;

const EXACT_BOOST: f64 = 1.0;
const PREFIX_BOOST: f64 = 0.8;
const CONTAINS_BOOST: f64 = 0.5;
const POSTAL_EXACT_RANK: f64 = 1.0;
const POSTAL_PREFIX_RANK: f64 = 0.7;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CityHit {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub postal_codes: Vec<String>,
    pub department_id: i64,
    pub popular: bool,
    pub rank: f64,
}

/// Three independently ranked lists, never merged
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TerritorySearchResult {
    pub academies: Vec<Academy>,
    pub departments: Vec<Department>,
    pub cities: Vec<CityHit>,
}

/// Territories with their names normalized once, ready to be searched
#[derive(Debug, Default)]
pub struct TerritoryIndex {
    academies: Vec<(String, Academy)>,
    departments: Vec<(String, Department)>,
    cities: Vec<(String, City)>,
}

impl TerritoryIndex {
    pub fn new(academies: Vec<Academy>, departments: Vec<Department>, cities: Vec<City>) -> Self {
        Self {
            academies: academies.into_iter().map(|a| (normalize(&a.name), a)).collect(),
            departments: departments.into_iter().map(|d| (normalize(&d.name), d)).collect(),
            cities: cities.into_iter().map(|c| (normalize(&c.name), c)).collect(),
        }
    }

    pub fn search(&self, query: &str, limit: usize) -> TerritorySearchResult {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return TerritorySearchResult::default();
        }

        TerritorySearchResult {
            academies: self.search_academies(&normalized, limit),
            departments: self.search_departments(query, &normalized, limit),
            cities: self.search_cities(&normalized, limit),
        }
    }

    fn search_academies(&self, query: &str, limit: usize) -> Vec<Academy> {
        let mut hits: Vec<&(String, Academy)> = self
            .academies
            .iter()
            .filter(|(name, _)| name.contains(query))
            .collect();
        hits.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.name.cmp(&b.name)));
        hits.into_iter().take(limit).map(|(_, academy)| academy.clone()).collect()
    }

    fn search_departments(&self, raw: &str, query: &str, limit: usize) -> Vec<Department> {
        let code = raw.trim();
        let mut hits: Vec<&(String, Department)> = self
            .departments
            .iter()
            .filter(|(name, dep)| name.contains(query) || dep.code.eq_ignore_ascii_case(code))
            .collect();
        hits.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.name.cmp(&b.name)));
        hits.into_iter().take(limit).map(|(_, dep)| dep.clone()).collect()
    }

    fn search_cities(&self, query: &str, limit: usize) -> Vec<CityHit> {
        let postal = query.chars().all(|c| c.is_ascii_digit()).then_some(query);

        let mut hits: Vec<(&str, CityHit)> = self
            .cities
            .iter()
            .filter_map(|(name, city)| {
                let rank = match postal {
                    Some(code) => postal_rank(code, &city.postal_codes),
                    None => city_rank(query, name),
                };
                let hit = CityHit {
                    id: city.id,
                    name: city.name.clone(),
                    slug: city.slug.clone(),
                    postal_codes: city.postal_codes.clone(),
                    department_id: city.department_id,
                    popular: city.popular,
                    rank,
                };
                (rank > 0.0).then_some((name.as_str(), hit))
            })
            .collect();

        // ties break on the accent-free name
        hits.sort_by(|(ka, a), (kb, b)| {
            b.rank
                .partial_cmp(&a.rank)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ka.cmp(kb))
                .then_with(|| a.name.cmp(&b.name))
        });
        hits.into_iter().take(limit).map(|(_, hit)| hit).collect()
    }
}

/// Greater of the text rank and the exact/prefix/substring boost
pub fn city_rank(query: &str, name: &str) -> f64 {
    text_rank(query, name).max(match_boost(query, name))
}

fn text_rank(query: &str, name: &str) -> f64 {
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    if query_tokens.is_empty() {
        return 0.0;
    }

    // every query token must prefix-match a name token
    let all_matched = query_tokens
        .iter()
        .all(|q| name.split_whitespace().any(|token| token.starts_with(*q)));
    if all_matched {
        return TOKEN_RANK_WEIGHT;
    }

    let similarity = trigram_similarity(query, name);
    if similarity >= TRIGRAM_THRESHOLD {
        similarity * TOKEN_RANK_WEIGHT
    } else {
        0.0
    }
}

fn match_boost(query: &str, name: &str) -> f64 {
    if name == query {
        EXACT_BOOST
    } else if name.starts_with(query) {
        PREFIX_BOOST
    } else if name.contains(query) {
        CONTAINS_BOOST
    } else {
        0.0
    }
}

fn postal_rank(code: &str, postal_codes: &[String]) -> f64 {
    if postal_codes.iter().any(|c| c == code) {
        POSTAL_EXACT_RANK
    } else if postal_codes.iter().any(|c| c.starts_with(code)) {
        POSTAL_PREFIX_RANK
    } else {
        0.0
    }
}
