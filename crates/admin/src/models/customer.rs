//! Customer domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradedesk_core::customer_csv::CustomerCsvRow;
use tradedesk_core::forms::CustomerForm;
use tradedesk_core::listing::{Listable, SortKey};
use tradedesk_core::{CustomerCode, CustomerId, PhoneNumber, StoreId, sort_fields};

/// A customer of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub store_id: StoreId,
    pub code: CustomerCode,
    pub name: String,
    pub contact_person: Option<String>,
    pub address: Option<String>,
    pub phone: Option<PhoneNumber>,
    pub delivery_condition: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// The customer as an editable form.
    #[must_use]
    pub fn to_form(&self) -> CustomerForm {
        CustomerForm {
            code: self.code.to_string(),
            name: self.name.clone(),
            contact_person: self.contact_person.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
            phone: self
                .phone
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            delivery_condition: self.delivery_condition.clone().unwrap_or_default(),
            note: self.note.clone().unwrap_or_default(),
        }
    }

    /// The customer as an export row.
    #[must_use]
    pub fn to_csv_row(&self, store_name: &str) -> CustomerCsvRow {
        let form = self.to_form();
        CustomerCsvRow {
            code: form.code,
            store_name: store_name.to_string(),
            name: form.name,
            contact_person: form.contact_person,
            address: form.address,
            phone: form.phone,
            delivery_condition: form.delivery_condition,
            note: form.note,
        }
    }
}

sort_fields! {
    /// Sortable columns of the customer list.
    pub enum CustomerField {
        Code => "code",
        Name => "name",
        ContactPerson => "contact_person",
        Address => "address",
        Phone => "phone",
        UpdatedAt => "updated_at",
    }
}

impl Listable for Customer {
    type Field = CustomerField;

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.code.as_str(), self.name.as_str()];
        text.extend(self.contact_person.as_deref());
        text.extend(self.address.as_deref());
        text.extend(self.phone.as_ref().map(PhoneNumber::as_str));
        text
    }

    fn sort_key(&self, field: CustomerField) -> SortKey {
        match field {
            CustomerField::Code => SortKey::text(self.code.as_str()),
            CustomerField::Name => SortKey::text(&self.name),
            CustomerField::ContactPerson => SortKey::opt_text(self.contact_person.as_deref()),
            CustomerField::Address => SortKey::opt_text(self.address.as_deref()),
            CustomerField::Phone => SortKey::opt_text(self.phone.as_ref().map(PhoneNumber::as_str)),
            CustomerField::UpdatedAt => SortKey::Int(self.updated_at.timestamp()),
        }
    }
}

/// Entry of the customer picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerOption {
    pub id: CustomerId,
    pub code: String,
    pub name: String,
}

impl From<&Customer> for CustomerOption {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            code: customer.code.to_string(),
            name: customer.name.clone(),
        }
    }
}

/// Outcome of a CSV import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub created: u64,
    pub updated: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tradedesk_core::listing::ListQuery;

    fn customer(id: i32, code: &str, name: &str, phone: Option<&str>) -> Customer {
        Customer {
            id: CustomerId::new(id),
            store_id: StoreId::new(1),
            code: CustomerCode::parse(code).unwrap(),
            name: name.to_string(),
            contact_person: None,
            address: Some("Osaka".to_string()),
            phone: phone.map(|p| PhoneNumber::parse(p).unwrap()),
            delivery_condition: None,
            note: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_search_covers_code_name_and_phone() {
        let customers = vec![
            customer(1, "C-001", "Sato Shoten", Some("06-1111-2222")),
            customer(2, "C-002", "Aoki Foods", None),
        ];
        let query = ListQuery {
            q: Some("1111".to_string()),
            ..ListQuery::default()
        };
        let listing = query.apply(customers, 20);
        assert_eq!(listing.total_items, 1);
        assert_eq!(listing.items().next().unwrap().id, CustomerId::new(1));
    }

    #[test]
    fn test_missing_phone_sorts_last() {
        let customers = vec![
            customer(1, "C-001", "A", None),
            customer(2, "C-002", "B", Some("03-0000-0000")),
        ];
        let query = ListQuery {
            sort: Some("phone".to_string()),
            order: Some("desc".to_string()),
            ..ListQuery::default()
        };
        let listing = query.apply(customers, 20);
        let ids: Vec<i32> = listing.items().map(|c| c.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_csv_row_uses_store_name() {
        let row = customer(1, "C-001", "Sato", None).to_csv_row("Main");
        assert_eq!(row.store_name, "Main");
        assert_eq!(row.code, "C-001");
        assert_eq!(row.phone, "");
        assert_eq!(row.address, "Osaka");
    }
}
