use contracts::domain::a001_product::ProductDraft;

/// Проверка одного кандидата. Возвращает первую найденную причину отказа.
pub fn validate(draft: Option<&ProductDraft>) -> Result<(), String> {
    let Some(draft) = draft else {
        return Err("record is empty.".into());
    };
    if draft.name.trim().is_empty() {
        return Err("name is required.".into());
    }
    if draft.price <= 0.0 {
        return Err("price must be positive.".into());
    }
    if draft.stock < 0 {
        return Err("stock must not be negative.".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price: f64) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            price,
            ..Default::default()
        }
    }

    fn with_stock(stock: i32) -> ProductDraft {
        ProductDraft {
            stock,
            ..draft("Lamp", 1.0)
        }
    }

    #[test]
    fn test_first_failure_wins() {
        assert_eq!(validate(None), Err("record is empty.".into()));
        assert_eq!(
            validate(Some(&draft("  ", -1.0))),
            Err("name is required.".into())
        );
        assert_eq!(
            validate(Some(&draft("Lamp", 0.0))),
            Err("price must be positive.".into())
        );
        assert_eq!(validate(Some(&draft("Lamp", 0.01))), Ok(()));
    }

    #[test]
    fn test_stock_must_not_be_negative() {
        assert_eq!(
            validate(Some(&with_stock(-1))),
            Err("stock must not be negative.".into())
        );
        assert_eq!(validate(Some(&with_stock(0))), Ok(()));
        // цена проверяется раньше остатка
        let both = ProductDraft {
            price: 0.0,
            ..with_stock(-1)
        };
        assert_eq!(
            validate(Some(&both)),
            Err("price must be positive.".into())
        );
    }
}
