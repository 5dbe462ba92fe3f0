//! Minimal demo run of the simulated stack: two identities, one DAP,
//! one relation, printed as the receiving identity's context.

use anyhow::Result;
use serde_json::json;

use docchain_core::config::CoreConfig;
use docchain_core::schema::{params, DapSchema};
use docchain_core::{DapObject, Registration, TransitionHeader, TransitionPacket};
use docchain_node::Gateway;

fn contacts_schema() -> DapSchema {
    DapSchema::new(json!({
        "$schema": params::DAP_SCHEMA_META_URI,
        "title": "contactsdap",
        "contact": {
            "type": "object",
            "allOf": [{"$ref": params::DAP_OBJECT_BASE_REF}],
            "properties": {
                "toUser": {"$ref": params::RELATION_REF},
                "note": {"type": "string"}
            },
            "required": ["toUser"]
        }
    }))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut gateway = Gateway::new(CoreConfig::development())?;

    let alice = gateway.register_identity(Registration::new("alice", "pubkey-alice")?)?;
    let bob = gateway.register_identity(Registration::new("bob", "pubkey-bob")?)?;

    let dapid = gateway.register_schema(contacts_schema(), &alice)?;
    let schema = gateway
        .find_contract(&dapid)
        .expect("contract registered")
        .dapschema
        .clone();

    // Alice files a contact request pointing at Bob
    let mut contact = DapObject::new("contact")
        .with_field("toUser", json!({"userId": bob}))
        .with_field("note", json!("hi bob"));
    contact.id = "contact-alice-bob".to_string();

    let packet = TransitionPacket::for_objects(&dapid, vec![contact], &schema)?;
    let header = TransitionHeader::compose(
        &alice,
        packet.meta.id.as_deref().expect("packet id assigned"),
        None,
    )?;
    gateway.submit_mutation(header, packet)?;

    let context = gateway.get_context(&dapid, &bob);
    println!("{}", serde_json::to_string_pretty(&context)?);
    println!("chain tip: {:?}", gateway.tip());
    Ok(())
}
