//! Error taxonomy for the core. Every fallible operation in this crate
//! returns a `Result` built on these kinds: geometry/spacing errors are
//! caller-recoverable, everything else aborts the step.

error_chain! {
    foreign_links {
        Toml(::toml::de::Error);
        Io(::std::io::Error);
    }

    errors {
        /// Invalid `Nx`/`Ny`, `dt`, `Re`, or an unset division spacing.
        ConfigError(msg: String) {
            description("invalid configuration")
            display("invalid configuration: {}", msg)
        }

        /// The mesh reader produced inconsistent data.
        MalformedMeshError(msg: String) {
            description("malformed mesh data")
            display("malformed mesh data: {}", msg)
        }

        /// A division axis failed to cross exactly two polygon edges.
        GeometryError(msg: String) {
            description("geometry error")
            display("geometry error: {}", msg)
        }

        /// The perpendicular walk could not reach the required half-gap.
        DivisionSpacingError(msg: String) {
            description("division spacing error")
            display("division spacing error: {}", msg)
        }

        /// FFT thread initialisation failure, or a zero pressure
        /// denominator outside the four gauge modes.
        NumericError(msg: String) {
            description("numeric error")
            display("numeric error: {}", msg)
        }

        /// The cell-cell force encountered nodes with differing
        /// attribute-vector lengths.
        AttributeMismatch(msg: String) {
            description("attribute length mismatch")
            display("attribute mismatch: {}", msg)
        }
    }
}
