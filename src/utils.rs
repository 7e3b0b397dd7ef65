//! Identifier helpers

use bech32::Bech32m;
use uuid7::uuid7;

use super::document::DocumentKind;
use super::error::WorkflowError;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_document_id(kind: DocumentKind) -> Result<String, WorkflowError> {
    Ok(new_uuid_to_bech32(kind.id_prefix())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_kind_prefix() {
        assert!(
            new_document_id(DocumentKind::MaterialRequest)
                .unwrap()
                .starts_with("mreq_1")
        );
        assert!(
            new_document_id(DocumentKind::Project)
                .unwrap()
                .starts_with("proj_1")
        );
    }

    #[test]
    fn empty_hrp_fails() {
        assert!(new_uuid_to_bech32("").is_err());
    }
}
