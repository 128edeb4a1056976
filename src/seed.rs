//! Demo dataset loader, run with `campus-api seed`.
//!
//! Goes through the `Store` trait so the same data lands identically in
//! Postgres and the in-memory store. Idempotence is not attempted; run it
//! against an empty database.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::auth::password;
use crate::store::models::{
    NewBranch, NewFeePayment, NewInstitution, NewInventoryItem, NewPurchaseEntry, NewStudent,
    NewUser, Role, StudentStatus,
};
use crate::store::Store;

pub async fn run(store: Arc<dyn Store>, bcrypt_cost: u32) -> Result<()> {
    let hash = |plaintext: &str| -> Result<String> {
        password::set_password(plaintext, bcrypt_cost).context("password hashing failed")
    };

    store
        .create_user(
            NewUser {
                name: "Company Admin".into(),
                email: "company@erp.com".into(),
                phone: None,
                role: Role::CompanyAdmin,
                institution_id: None,
                branch_id: None,
                staff_category: None,
            },
            hash("Admin@123")?,
        )
        .await?;

    let institution = store
        .create_institution(NewInstitution {
            name: "Ematix Public School".into(),
            code: "INST001".into(),
            location: Some("Main Road, Chennai".into()),
            logo: None,
            max_branches: 10,
        })
        .await?;

    store
        .create_user(
            NewUser {
                name: "Institution Admin".into(),
                email: "inst@ematix.com".into(),
                phone: None,
                role: Role::InstitutionAdmin,
                institution_id: Some(institution.id),
                branch_id: None,
                staff_category: None,
            },
            hash("Admin@123")?,
        )
        .await?;

    let branch1 = store
        .create_branch(NewBranch {
            institution_id: institution.id,
            branch_name: "Ematix - Chrompet".into(),
            address: Some("Chrompet, Chennai".into()),
            location: Some("Chrompet".into()),
            manager_name: Some("Branch Manager 1".into()),
            manager_email: Some("bm1@ematix.com".into()),
            contact_phone: Some("9876543210".into()),
            classes: vec!["LKG".into(), "UKG".into(), "1st Std".into(), "2nd Std".into()],
            fees_text: Some("LKG:20000, UKG:21000, 1st Std:25000, 2nd Std:26000".into()),
        })
        .await?;

    let branch2 = store
        .create_branch(NewBranch {
            institution_id: institution.id,
            branch_name: "Ematix - Tambaram".into(),
            address: Some("Tambaram, Chennai".into()),
            location: Some("Tambaram".into()),
            manager_name: Some("Branch Manager 2".into()),
            manager_email: Some("bm2@ematix.com".into()),
            contact_phone: Some("9876500000".into()),
            classes: vec!["1st Std".into(), "2nd Std".into(), "3rd Std".into()],
            fees_text: Some("1st Std:24000, 2nd Std:25500, 3rd Std:27000".into()),
        })
        .await?;

    for (n, branch) in [(1, &branch1), (2, &branch2)] {
        store
            .create_user(
                NewUser {
                    name: format!("Branch Admin {n}"),
                    email: branch.manager_email.clone().unwrap_or_default(),
                    phone: None,
                    role: Role::BranchAdmin,
                    institution_id: Some(institution.id),
                    branch_id: Some(branch.id),
                    staff_category: None,
                },
                hash("Branch@123")?,
            )
            .await?;
    }

    for (n, phone, category) in [(1, "9876543218", "teaching"), (2, "9876543219", "non-teaching")]
    {
        store
            .create_user(
                NewUser {
                    name: format!("Staff Member {n}"),
                    email: format!("staff{n}@ematix.com"),
                    phone: Some(phone.into()),
                    role: Role::Staff,
                    institution_id: Some(institution.id),
                    branch_id: Some(branch1.id),
                    staff_category: Some(category.into()),
                },
                hash("Staff@123")?,
            )
            .await?;
    }

    // (name, class, section, roll, parent, phone, admission, status)
    let students_b1 = [
        ("Rahul Sharma", "1", "A", "1", "Vijay Sharma", "9876543210", "202425-0001", StudentStatus::Active),
        ("Priya Patel", "1", "A", "2", "Rajesh Patel", "9876543211", "202425-0002", StudentStatus::Active),
        ("Arun Kumar", "2", "B", "1", "Suresh Kumar", "9876543212", "202425-0003", StudentStatus::Active),
        ("Sneha Reddy", "2", "B", "2", "Kiran Reddy", "9876543213", "202425-0004", StudentStatus::Active),
        ("Karthik Nair", "1", "A", "3", "Mohan Nair", "9876543214", "202425-0005", StudentStatus::Left),
    ];
    for (name, class, section, roll, parent, phone, admission, status) in students_b1 {
        store
            .create_student(NewStudent {
                branch_id: branch1.id,
                name: name.into(),
                class: class.into(),
                section: Some(section.into()),
                roll_no: Some(roll.into()),
                parent_name: Some(parent.into()),
                phone_no: Some(phone.into()),
                address: Some("Chrompet, Chennai - 600044".into()),
                admission_number: admission.into(),
                academic_year: Some("2024/25".into()),
                status,
            })
            .await?;
    }

    let students_b2 = [
        ("Meera Singh", "1", "A", "1", "Amit Singh", "9876543215", "202425-0006", StudentStatus::Active),
        ("Vikram Joshi", "2", "A", "1", "Deepak Joshi", "9876543216", "202425-0007", StudentStatus::Active),
        ("Anjali Gupta", "3", "A", "1", "Raj Gupta", "9876543217", "202425-0008", StudentStatus::Transferred),
    ];
    for (name, class, section, roll, parent, phone, admission, status) in students_b2 {
        store
            .create_student(NewStudent {
                branch_id: branch2.id,
                name: name.into(),
                class: class.into(),
                section: Some(section.into()),
                roll_no: Some(roll.into()),
                parent_name: Some(parent.into()),
                phone_no: Some(phone.into()),
                address: Some("Tambaram, Chennai - 600045".into()),
                admission_number: admission.into(),
                academic_year: Some("2024/25".into()),
                status,
            })
            .await?;
    }

    let payments = [
        (branch1.id, "Rahul Sharma", 25_000),
        (branch1.id, "Priya Patel", 25_000),
        (branch1.id, "Arun Kumar", 26_000),
        (branch1.id, "Sneha Reddy", 26_000),
        (branch2.id, "Meera Singh", 24_000),
        (branch2.id, "Vikram Joshi", 25_500),
    ];
    for (branch_id, student_name, amount) in payments {
        store
            .record_payment(NewFeePayment {
                branch_id,
                student_name: student_name.into(),
                amount,
                date: None,
                category: None,
                mode: None,
                note: None,
            })
            .await?;
    }

    // (category, name, description, stock, min, unit)
    // The first two items start at zero; their stock arrives through the
    // purchase entries below, which bump stock as part of recording.
    let items = [
        ("uniforms", "School Uniform Set", "Complete uniform set for students", 0, 10, "sets"),
        ("books", "Mathematics Textbook", "Grade 1 Mathematics textbook", 0, 5, "books"),
        ("stationery", "Notebooks", "A4 size notebooks", 100, 20, "pieces"),
        ("shoes", "School Shoes", "Black school shoes", 15, 5, "pairs"),
    ];
    let mut item_ids = Vec::new();
    for (category, name, description, stock, min, unit) in items {
        let item = store
            .create_inventory_item(NewInventoryItem {
                branch_id: branch1.id,
                category: category.into(),
                name: name.into(),
                description: Some(description.into()),
                current_stock: stock,
                min_quantity: min,
                unit: Some(unit.into()),
            })
            .await?;
        item_ids.push(item.id);
    }

    let purchases = [
        (item_ids[0], 50, "Uniform Suppliers Ltd", "INV001", (2024, 1, 15), "Initial stock purchase"),
        (item_ids[1], 30, "Book Publishers Inc", "INV002", (2024, 1, 20), "Textbook delivery"),
    ];
    for (item_id, quantity, supplier, invoice, (y, m, d), notes) in purchases {
        store
            .record_purchase(
                item_id,
                NewPurchaseEntry {
                    quantity,
                    supplier_name: Some(supplier.into()),
                    invoice_number: Some(invoice.into()),
                    purchase_date: NaiveDate::from_ymd_opt(y, m, d),
                    notes: Some(notes.into()),
                },
            )
            .await?;
    }

    tracing::info!("seed data inserted");
    tracing::info!("company admin: company@erp.com / Admin@123");
    tracing::info!("institution admin: inst@ematix.com / Admin@123");
    tracing::info!("branch admins: bm1@ematix.com, bm2@ematix.com / Branch@123");
    tracing::info!("staff: staff1@ematix.com, staff2@ematix.com / Staff@123");

    Ok(())
}
