//! Lenient parser for the `display-name <addr-spec>` form used in
//! message headers, loosely following [RFC2822] section 3.4.
//!
//! Anything that does not look like a name-addr is taken as a bare
//! address, the way mail user agents read hand-written headers.
//!
//! [RFC2822]: https://datatracker.ietf.org/doc/html/rfc2822#section-3.4

use chumsky::{error::Cheap, prelude::*};

// quoted-string   =       DQUOTE *([FWS] qcontent) [FWS] DQUOTE
// qcontent        =       qtext / quoted-pair
fn quoted_string() -> impl Parser<char, String, Error = Cheap<char>> {
    choice((
        just('\\').ignore_then(any()),
        filter(|c: &char| !matches!(*c, '"' | '\\')),
    ))
    .repeated()
    .delimited_by(just('"').ignored(), just('"').ignored())
    .collect()
}

// phrase, without the atext restriction
fn phrase() -> impl Parser<char, String, Error = Cheap<char>> {
    filter(|c: &char| !matches!(*c, '<' | '>' | '"'))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|phrase| phrase.trim().to_owned())
}

// display-name    =       phrase
fn display_name() -> impl Parser<char, Option<String>, Error = Cheap<char>> {
    choice((quoted_string(), phrase()))
        .padded()
        .or_not()
        .map(|name| name.filter(|name| !name.trim().is_empty()))
}

// angle-addr      =       [CFWS] "<" addr-spec ">" [CFWS]
fn angle_addr() -> impl Parser<char, String, Error = Cheap<char>> {
    filter(|c: &char| !matches!(*c, '<' | '>'))
        .repeated()
        .delimited_by(just('<').ignored(), just('>').ignored())
        .collect::<String>()
        .map(|addr| addr.trim().to_owned())
        .padded()
}

// name-addr       =       [display-name] angle-addr
fn name_addr() -> impl Parser<char, (Option<String>, String), Error = Cheap<char>> {
    display_name().then(angle_addr())
}

fn addr_spec() -> impl Parser<char, String, Error = Cheap<char>> {
    any()
        .repeated()
        .collect::<String>()
        .map(|addr| addr.trim().to_owned())
}

// mailbox         =       name-addr / addr-spec
pub(super) fn mailbox() -> impl Parser<char, (Option<String>, String), Error = Cheap<char>> {
    choice((
        name_addr().then_ignore(end()),
        addr_spec().map(|addr| (None, addr)).then_ignore(end()),
    ))
}
