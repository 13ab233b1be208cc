//! Errors of this crate

error_chain!{
    foreign_links {
        Io(::std::io::Error);
        Json(::serde_json::Error);
    }

    errors {
        // The file ended while `field` was expected.
        UnexpectedEnd(field: &'static str) {
            description("unexpected end of file")
            display("unexpected end of file while reading {}", field)
        }
        // A token could not be parsed as `field`.
        InvalidToken(field: &'static str, token: String) {
            description("invalid token")
            display("invalid token '{}' while reading {}", token, field)
        }
        // A node refers to a child or leaf that does not exist.
        InvalidNode(id: usize) {
            description("invalid node")
            display("node {} has an invalid structure", id)
        }
        EmptyTrainingSet {
            description("empty training set")
            display("cannot grow a tree without training samples")
        }
        LabelMismatch(expected: usize, got: usize) {
            description("label count mismatch")
            display("expected sample sets for {} labels, got {}", expected, got)
        }
        InvalidConfig(reason: String) {
            description("invalid tree configuration")
            display("invalid tree configuration: {}", reason)
        }
        InvalidSubset(label: usize, index: usize) {
            description("invalid subset index")
            display("subset index {} is out of range for label {}", index, label)
        }
    }
}
