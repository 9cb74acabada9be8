//! Session orchestrator: filter, chunk, and run fields through
//! encode -> send -> decode, merging into one result.

use crate::catalog::{from_categories, FieldCatalog};
use crate::codec::Codec;
use crate::error::BbdlError;
use crate::options::{Options, RequestSpec};
use crate::request::{self, Identifier};
use crate::response;
use crate::result::RequestResult;
use crate::transport::{self, CancelToken, FileTransfer, PollConfig};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

/// Fields per request file.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Upper-cased, sorted, de-duplicated subset of `fields` that the license
/// allows: returned by [`from_categories`] for `categories`, or listed in `open_fields`.
pub fn limit_fields_to_categories<S: AsRef<str>>(
    catalog: &dyn FieldCatalog,
    fields: &[S],
    categories: &[&str],
    open_fields: &[&str],
) -> Vec<String> {
    let mut allowed: HashSet<String> = from_categories(catalog, categories, false)
        .into_iter()
        .map(|m| m.to_uppercase())
        .collect();
    allowed.extend(open_fields.iter().map(|f| f.to_uppercase()));

    let requested: BTreeSet<String> = fields.iter().map(|f| f.as_ref().to_uppercase()).collect();
    let kept: Vec<String> = requested
        .iter()
        .filter(|f| allowed.contains(f.as_str()))
        .cloned()
        .collect();
    info!("using {}/{} requested fields", kept.len(), requested.len());
    kept
}

/// One logical session over a file-transfer connection.
pub struct Session<'c, T: FileTransfer> {
    transport: T,
    catalog: &'c dyn FieldCatalog,
    options: Options,
    chunk_size: usize,
    categories: Option<Vec<String>>,
    open_fields: Vec<String>,
    poll: Option<PollConfig>,
    cancel: CancelToken,
    use_custom_mappings: bool,
}

impl<'c, T: FileTransfer> Session<'c, T> {
    pub fn new(
        transport: T,
        catalog: &'c dyn FieldCatalog,
        options: Options,
    ) -> Result<Self, BbdlError> {
        Ok(Self {
            transport,
            catalog,
            options: options.validated()?,
            chunk_size: DEFAULT_CHUNK_SIZE,
            categories: None,
            open_fields: Vec::new(),
            poll: None,
            cancel: CancelToken::new(),
            use_custom_mappings: true,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Restrict requests to licensed categories, plus fields that are always allowed.
    pub fn with_categories<I, J, S, U>(mut self, categories: I, open_fields: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = U>,
        S: Into<String>,
        U: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self.open_fields = open_fields.into_iter().map(Into::into).collect();
        self
    }

    /// Override the poll timing derived from options.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_custom_mappings(mut self, enabled: bool) -> Self {
        self.use_custom_mappings = enabled;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request `fields` for `identifiers`, one chunk at a time.
    pub fn request<S: AsRef<str>>(
        &mut self,
        identifiers: &[Identifier],
        fields: &[S],
        spec: RequestSpec,
    ) -> Result<RequestResult, BbdlError> {
        let options = self.options.specialize(spec)?;
        let fields: Vec<String> = match &self.categories {
            Some(categories) => {
                let categories: Vec<&str> = categories.iter().map(String::as_str).collect();
                let open: Vec<&str> = self.open_fields.iter().map(String::as_str).collect();
                limit_fields_to_categories(self.catalog, fields, &categories, &open)
            }
            None => fields.iter().map(|f| f.as_ref().to_string()).collect(),
        };

        let poll = self
            .poll
            .clone()
            .unwrap_or_else(|| PollConfig::from_options(&options));
        let codec = Codec::new(self.catalog).with_custom_mappings(self.use_custom_mappings);
        let total = fields.len().div_ceil(self.chunk_size);
        let mut result = RequestResult::new();

        for (n, chunk) in fields.chunks(self.chunk_size).enumerate() {
            info!(
                chunk = n + 1,
                of = total,
                fields = chunk.len(),
                identifiers = identifiers.len(),
                "sending request"
            );
            let request_path = options.tempdir.join(format!("fprp{n:02}.req"));
            let response_path = options.tempdir.join(format!("fprp{n:02}.out"));

            request::build(identifiers, chunk, &request_path, &options)?;
            let reply = transport::send(
                &mut self.transport,
                &request_path,
                &response_path,
                &options,
                &poll,
                &self.cancel,
            )?;
            let decoded = response::decode_file(&reply, &codec, options.delimiter)?;
            info!(
                chunk = n + 1,
                rows = decoded.data.len(),
                errors = decoded.errors.len(),
                "chunk decoded"
            );
            result.extend(decoded);
        }
        Ok(result)
    }

    /// Close the transport. Errors are logged, not returned.
    pub fn close(mut self) {
        if let Err(e) = self.transport.close() {
            warn!("error closing transport session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CsvFieldCatalog, FieldInfo};

    fn catalog() -> CsvFieldCatalog {
        let rows = [
            ("PX_LAST", "Pricing"),
            ("NAME", "Security Master"),
            ("EQY_DVD_YLD_IND", "Fundamentals"),
            ("ID_BB_GLOBAL", "Open Source"),
            ("BH_PX_LAST", "Pricing"),
        ];
        CsvFieldCatalog::from_fields(rows.iter().map(|(m, c)| FieldInfo {
            mnemonic: m.to_string(),
            category: c.to_string(),
            type_name: "Character".into(),
        }))
    }

    #[test]
    fn limits_to_licensed_categories() {
        let cat = catalog();
        let kept = limit_fields_to_categories(
            &cat,
            &["px_last", "name", "eqy_dvd_yld_ind", "NAME", "UNKNOWN", "id_bb_global", "bh_px_last"],
            &["Pricing", "Security Master"],
            &["ID_BB_GLOBAL"],
        );
        assert_eq!(kept, ["ID_BB_GLOBAL", "NAME", "PX_LAST"]);
    }

    #[test]
    fn nothing_allowed() {
        let cat = catalog();
        let kept = limit_fields_to_categories(&cat, &["PX_LAST"], &[], &[]);
        assert!(kept.is_empty());
    }
}
