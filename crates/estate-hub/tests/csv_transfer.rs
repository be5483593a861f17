//! Bulk listing import and export against the document store, as the CLI drives it.

use estate_hub::auth::{AuthUser, Role};
use estate_hub::catalog::Category;
use estate_hub::properties::Property;
use estate_hub::store::DocumentStore;
use estate_hub::transfer::{export_csv, import_csv, EntityKind};

fn admin() -> AuthUser {
    AuthUser {
        id: "admin-1".to_string(),
        name: "Importer".to_string(),
        email: "importer@example.com".to_string(),
        role: Role::Admin,
    }
}

const CATEGORIES: &str = "name,description,active\nCondo,Shared buildings,true\nTownhouse,,yes\n";

#[test]
fn properties_import_after_their_categories() {
    let store = DocumentStore::in_memory();
    let caller = admin();

    let report = import_csv(&store, EntityKind::Categories, CATEGORIES.as_bytes(), &caller, false)
        .expect("categories import");
    assert_eq!(report.imported, 2);
    let condo = store
        .find_one(|category: &Category| category.name == "Condo")
        .unwrap()
        .expect("condo stored");

    let listings = format!(
        "title,listing_type,price,city,bedrooms,category_id,images,status\n\
         Loft on 5th,sale,350000,Denver,2,{id},a.jpg;b.jpg,published\n\
         Garden Flat,rent,1800,Denver,1,no-such-category,,\n\
         Studio,lease,900,Denver,,,,\n",
        id = condo.id
    );

    let dry = import_csv(&store, EntityKind::Properties, listings.as_bytes(), &caller, true)
        .expect("dry run");
    assert!(dry.dry_run);
    assert_eq!(dry.total_rows, 3);
    assert_eq!(dry.valid_rows, 1);
    assert_eq!(dry.imported, 0);
    assert!(store.all::<Property>().unwrap().is_empty());

    let report = import_csv(&store, EntityKind::Properties, listings.as_bytes(), &caller, false)
        .expect("import");
    assert_eq!(report.imported, 1);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.errors[0].row, 3);
    assert!(report.errors[0].message.contains("no-such-category"));
    assert_eq!(report.errors[1].row, 4);
    assert_eq!(report.errors[1].column, "listing_type");

    let stored = store.all::<Property>().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].slug, "loft-on-5th");
    assert_eq!(stored[0].owner_id, "admin-1");
    assert_eq!(stored[0].images, vec!["a.jpg", "b.jpg"]);

    let mut out = Vec::new();
    let rows = export_csv(&store, EntityKind::Properties, &mut out).expect("export");
    assert_eq!(rows, 1);
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("id,slug,title,"));
    let row = lines.next().unwrap();
    assert!(row.contains("loft-on-5th,Loft on 5th,,sale,apartment,published,350000.0"));
    assert!(row.contains("a.jpg;b.jpg"));
}

#[test]
fn missing_required_header_is_reported_on_line_one() {
    let store = DocumentStore::in_memory();
    let report = import_csv(
        &store,
        EntityKind::States,
        "name\nTexas\n".as_bytes(),
        &admin(),
        false,
    )
    .expect("report");
    assert_eq!(report.imported, 0);
    assert!(report
        .errors
        .iter()
        .any(|error| error.row == 1 && error.column == "code"));
}
