use tracing::debug;

use super::filters::{AccommodationFilter, ListingQuery, TerritoryRequest, TerritoryScope};
use super::ordering::sort_availability_first;
use super::prices::{price_bounds, PriceBounds};
use super::{paginate, AccommodationView, Page, PageRequest};
use crate::error::{Error, Result};
use crate::storage::Database;

/// Storage-backed listing queries
#[derive(Debug, Clone)]
pub struct ListingService {
    db: Database,
    default_page_size: usize,
}

impl ListingService {
    pub fn new(db: Database, default_page_size: usize) -> Self {
        Self {
            db,
            default_page_size,
        }
    }

    /// Parses the query and resolves its territory against storage
    pub async fn filter_for(&self, query: &ListingQuery) -> Result<AccommodationFilter> {
        let (mut filter, territory) = AccommodationFilter::parse(query)?;

        filter.territory = match territory {
            None => None,
            Some(TerritoryRequest::City(slug)) => {
                Some(TerritoryScope::City(self.db.get_city_by_slug(&slug).await?))
            }
            Some(TerritoryRequest::Department(code)) => {
                let department = self.db.get_department_by_code(&code).await?;
                Some(TerritoryScope::from_department_codes([department.code]))
            }
            Some(TerritoryRequest::Academy(id)) => {
                let academy = self.db.get_academy(id).await?;
                let departments = self.db.list_departments(Some(academy.id)).await?;
                Some(TerritoryScope::from_department_codes(
                    departments.into_iter().map(|d| d.code),
                ))
            }
        };

        Ok(filter)
    }

    pub async fn search(&self, query: &ListingQuery) -> Result<Page<AccommodationView>> {
        let request = PageRequest::new(query.page, query.page_size, self.default_page_size)?;
        let filter = self.filter_for(query).await?;

        let mut matches = filter.apply(self.db.list_published_accommodations().await?);
        sort_availability_first(&mut matches);
        debug!("{} accommodations match {:?}", matches.len(), filter);

        let page = paginate(matches, request);
        Ok(Page {
            count: page.count,
            page: page.page,
            page_size: page.page_size,
            results: page.results.into_iter().map(AccommodationView::from).collect(),
        })
    }

    /// Bounds over the filtered set; the price ceiling itself is ignored
    pub async fn price_bounds(&self, query: &ListingQuery) -> Result<PriceBounds> {
        let filter = self.filter_for(query).await?.without_price();
        let matches = filter.apply(self.db.list_published_accommodations().await?);
        Ok(price_bounds(&matches))
    }

    /// Published listing by slug; drafts are reported as missing
    pub async fn get(&self, slug: &str) -> Result<AccommodationView> {
        let accommodation = self.db.get_accommodation_by_slug(slug).await?;
        if !accommodation.published {
            return Err(Error::not_found("Accommodation", slug));
        }
        Ok(accommodation.into())
    }
}
