use chrono::{DateTime, Utc};
use contracts::domain::a001_product::{Product, ProductFilter};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{ColumnTrait, Condition};

use super::repository::Column;

/// Служебный символ в шаблонах LIKE
const LIKE_ESCAPE: char = '\\';

/// Ключ поиска по наименованию. Хранилище держит его в отдельной колонке,
/// так регистр сравнивается одинаково в памяти и в SQLite, в том числе
/// для кириллицы.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// `%фрагмент%` с экранированными `%`, `_` и `\`
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in search_key(fragment).chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Одно условие отбора
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    NameContains(String),
    PriceFrom(f64),
    PriceTo(f64),
    StockFrom(i32),
    CreatedFrom(DateTime<Utc>),
    CreatedTo(DateTime<Utc>),
    NotDeleted,
}

impl Clause {
    fn matches(&self, product: &Product) -> bool {
        match self {
            Clause::NameContains(fragment) => {
                search_key(&product.name).contains(&search_key(fragment))
            }
            Clause::PriceFrom(min) => product.price >= *min,
            Clause::PriceTo(max) => product.price <= *max,
            Clause::StockFrom(min) => product.stock >= *min,
            Clause::CreatedFrom(from) => product.metadata.created_at >= *from,
            Clause::CreatedTo(to) => product.metadata.created_at <= *to,
            Clause::NotDeleted => !product.is_deleted(),
        }
    }

    fn to_condition(&self) -> Condition {
        let expr = match self {
            Clause::NameContains(fragment) => Expr::col(Column::NameKey)
                .like(LikeExpr::new(contains_pattern(fragment)).escape(LIKE_ESCAPE)),
            Clause::PriceFrom(min) => Column::Price.gte(*min),
            Clause::PriceTo(max) => Column::Price.lte(*max),
            Clause::StockFrom(min) => Column::Stock.gte(*min),
            Clause::CreatedFrom(from) => Column::CreatedAt.gte(*from),
            Clause::CreatedTo(to) => Column::CreatedAt.lte(*to),
            Clause::NotDeleted => Column::IsDeleted.eq(false),
        };
        Condition::all().add(expr)
    }
}

/// Составное условие: конъюнкция условий, пустой список означает «истина».
///
/// Одно и то же условие можно проверить на товаре в памяти (`matches`)
/// или превратить в `Condition` для запроса к хранилищу.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPredicate {
    clauses: Vec<Clause>,
}

impl ProductPredicate {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.clauses.iter().all(|c| c.matches(product))
    }

    pub fn to_condition(&self) -> Condition {
        self.clauses
            .iter()
            .fold(Condition::all(), |cond, clause| cond.add(clause.to_condition()))
    }
}

pub struct FilterPredicateBuilder;

impl FilterPredicateBuilder {
    pub fn build(filter: &ProductFilter) -> ProductPredicate {
        let mut predicate = ProductPredicate::always();

        if let Some(fragment) = filter.name_fragment() {
            predicate = predicate.and(Clause::NameContains(fragment.to_string()));
        }
        if let Some(min) = filter.min_price {
            predicate = predicate.and(Clause::PriceFrom(min));
        }
        if let Some(max) = filter.max_price {
            predicate = predicate.and(Clause::PriceTo(max));
        }
        if let Some(min) = filter.min_stock {
            predicate = predicate.and(Clause::StockFrom(min));
        }
        if let Some(from) = filter.start_date {
            predicate = predicate.and(Clause::CreatedFrom(from));
        }
        if let Some(to) = filter.end_date {
            predicate = predicate.and(Clause::CreatedTo(to));
        }
        if !filter.include_deleted {
            predicate = predicate.and(Clause::NotDeleted);
        }

        predicate
    }
}
