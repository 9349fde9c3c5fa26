use crate::record::FieldRecord;
use crate::sources::{FetchError, FetchRequest, SourceId};

use super::error::PipelineWarning;

pub struct FetchContext {
    // Input
    pub request: FetchRequest,

    // Fan-out results, buffered by source identity
    pub partials: Vec<(SourceId, FieldRecord)>,
    pub failures: Vec<FetchError>,

    // Failures of optional sources that did not fail the phrase
    pub warnings: Vec<PipelineWarning>,
}

impl FetchContext {
    pub fn new(request: FetchRequest) -> Self {
        Self {
            request,
            partials: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
