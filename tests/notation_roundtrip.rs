use indoc::indoc;
use pretty_assertions::assert_eq;

use mosdl::notation::{ParseOptions, parse_str};
use mosdl::{DocMode, Specification, print_notation};

const UNIT: &str = indoc! {r#"
    //! Round trip unit.
    //!
    //! Second paragraph.

    /// Geometry.
    AREA Geo 12 2 {
        ATTRIBUTE Meters 30 "distance"

        FUNDAMENTAL Shape "any shape"

        /// Kinds of shape.
        ENUM Kind 1 {
            CIRCLE = 1 "round"
            SQUARE = 2
        }

        /// A named position.
        COMPOSITE Place 2 {
            name: String "label"
            at: Meters?
            kinds: Kind[]
        }

        COMPOSITE Abstract {
            id: Long
        }

        ERRORS {
            MISSING 70000 EXTRA Place "no such place"
        }

        /// Lookups.
        SERVICE Lookup 3 {
            COMPOSITE Query 1 EXTENDS Abstract {
                text: String?
            }

            ERRORS {
                TOO_MANY 1
            }

            /// Core operations.
            CAPABILITYSET 1 {
                SEND ping 1 {
                    send {
                        from: Identifier
                    }
                }

                /// Finds places.
                REQUEST find 2 REPLAY {
                    request {
                        q: Query
                    }
                    /// Matches.
                    response {
                        hits: Place[] "ordered"
                    }
                    ERRORS {
                        MISSING
                        TOO_MANY "limit hit"
                    }
                }
            }

            CAPABILITYSET 2 {
                PUBSUB watch 3 {
                    publishNotify {
                        place: Place
                    }
                }

                INVOKE locate 4 {
                    invoke { }
                    acknowledgement { }
                    response {
                        where: Place
                    }
                }
            }
        }
    }

    AREA Other 13 1 {
        COMPOSITE Place 1 {
            remote: Geo.Place
        }
    }
"#};

fn model() -> Specification {
    parse_str(UNIT, ParseOptions::default()).unwrap().spec
}

fn reparse(text: &str) -> Specification {
    parse_str(text, ParseOptions::default()).unwrap().spec
}

#[test]
fn test_inline_roundtrip() {
    let spec = model();
    let printed = print_notation(&spec, DocMode::Inline).unwrap();
    assert_eq!(reparse(&printed), spec);
}

#[test]
fn test_bulk_roundtrip() {
    let spec = model();
    let printed = print_notation(&spec, DocMode::Bulk).unwrap();
    assert!(printed.contains("/// @response.hits ordered\n"));
    assert!(printed.contains("/// @TOO_MANY limit hit\n"));
    assert_eq!(reparse(&printed), spec);
}

#[test]
fn test_suppress_roundtrip() {
    let spec = model();
    let printed = print_notation(&spec, DocMode::Suppress).unwrap();
    assert_eq!(reparse(&printed), spec.without_comments());
}

#[test]
fn test_printing_is_idempotent() {
    let spec = model();
    for mode in [DocMode::Bulk, DocMode::Inline, DocMode::Suppress] {
        let once = print_notation(&spec, mode).unwrap();
        let twice = print_notation(&reparse(&once), mode).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn test_declaration_order_preserved() {
    let printed = print_notation(&model(), DocMode::Suppress).unwrap();
    let geo = printed.find("AREA Geo").unwrap();
    let other = printed.find("AREA Other").unwrap();
    assert!(geo < other);
    let place = printed.find("COMPOSITE Place 2").unwrap();
    let abstract_ = printed.find("COMPOSITE Abstract").unwrap();
    assert!(place < abstract_);
}

#[test]
fn test_cross_area_reference_stays_qualified() {
    let printed = print_notation(&model(), DocMode::Inline).unwrap();
    assert!(printed.contains("remote: Geo.Place"));
}
