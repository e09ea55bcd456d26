//! Empty library target so Cargo accepts a benches-only package.
