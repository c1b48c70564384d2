//! Parsing for the `tp(..)` / `ts(..)` descriptor grammar.
//!
//! Serialization lives on [`TapLeaf::descriptor`] and
//! [`TapTree::descriptor`]; parsing a canonical string and serializing
//! the result reproduces the input byte for byte.
//!
//! Grammar:
//!
//! ```text
//! tree := "tp(" key [ "," node ] ")"
//! node := leaf | "[" node "," node "]"
//! leaf := "ts(" family "(" arg { "," arg } "))"
//! ```
//!
//! where `key` is a 64-digit x-only hex encoding and `family` is one of
//! `pk`, `csa` with optional `_hashlock` / `_delay` suffixes.

use tapforge_curve::PublicKey;

use crate::{
    errors::CommitmentError,
    leaf::TapLeaf,
    tree::{Node, TapTree},
};

/// Parses a leaf descriptor, `ts(..)`.
pub fn parse_leaf(input: &str) -> Result<TapLeaf, CommitmentError> {
    let mut parser = Parser::new(input);
    let leaf = parser.leaf()?;
    parser.finish()?;
    Ok(leaf)
}

/// Parses a tree descriptor, `tp(..)`.
pub fn parse_tree(input: &str) -> Result<TapTree, CommitmentError> {
    let mut parser = Parser::new(input);
    parser.literal("tp(")?;
    let internal = parser.x_only_key()?;
    let root = if parser.consume(',') {
        Some(parser.node()?)
    } else {
        None
    };
    parser.literal(")")?;
    parser.finish()?;
    Ok(match root {
        Some(root) => TapTree::new(internal, root),
        None => TapTree::key_path_only(internal),
    })
}

struct Parser<'s> {
    input: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(input: &'s str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, reason: &'static str) -> CommitmentError {
        CommitmentError::Descriptor {
            position: self.pos,
            reason,
        }
    }

    fn rest(&self) -> &'s str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn consume(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn literal(&mut self, expected: &'static str) -> Result<(), CommitmentError> {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            Ok(())
        } else {
            Err(self.error("unexpected input"))
        }
    }

    fn finish(&self) -> Result<(), CommitmentError> {
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(self.error("trailing input after descriptor"))
        }
    }

    /// Reads characters up to (not including) the next `,`, `)` or `]`.
    fn token(&mut self) -> &'s str {
        let rest = self.rest();
        let end = rest
            .find([',', ')', ']'])
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn x_only_key(&mut self) -> Result<PublicKey, CommitmentError> {
        let start = self.pos;
        let token = self.token();
        let mut bytes = [0u8; 32];
        if token.len() != 64 || hex::decode_to_slice(token, &mut bytes).is_err() {
            self.pos = start;
            return Err(self.error("expected a 64-digit x-only key"));
        }
        PublicKey::from_x_only(&bytes).map_err(|_| {
            self.pos = start;
            self.error("x-only key is not on the curve")
        })
    }

    fn digest(&mut self) -> Result<[u8; 20], CommitmentError> {
        let start = self.pos;
        let token = self.token();
        let mut bytes = [0u8; 20];
        if token.len() != 40 || hex::decode_to_slice(token, &mut bytes).is_err() {
            self.pos = start;
            return Err(self.error("expected a 40-digit hashlock digest"));
        }
        Ok(bytes)
    }

    fn integer(&mut self) -> Result<u32, CommitmentError> {
        let start = self.pos;
        let token = self.token();
        // Canonical descriptors carry no leading zeroes.
        if token.len() > 1 && token.starts_with('0') {
            self.pos = start;
            return Err(self.error("non-canonical integer"));
        }
        token.parse().map_err(|_| {
            self.pos = start;
            self.error("expected an integer")
        })
    }

    fn comma(&mut self) -> Result<(), CommitmentError> {
        if self.consume(',') {
            Ok(())
        } else {
            Err(self.error("expected ','"))
        }
    }

    fn node(&mut self) -> Result<Node, CommitmentError> {
        if self.consume('[') {
            let left = self.node()?;
            self.comma()?;
            let right = self.node()?;
            if !self.consume(']') {
                return Err(self.error("expected ']'"));
            }
            Ok(Node::branch(left, right))
        } else {
            Ok(Node::Leaf(self.leaf()?))
        }
    }

    fn leaf(&mut self) -> Result<TapLeaf, CommitmentError> {
        self.literal("ts(")?;
        let family_start = self.pos;
        let family = {
            let rest = self.rest();
            let end = rest.find('(').ok_or_else(|| self.error("expected '('"))?;
            self.pos += end;
            &rest[..end]
        };

        let (base, hashlock, delay) = match family {
            "pk" => ("pk", false, false),
            "pk_hashlock" => ("pk", true, false),
            "pk_delay" => ("pk", false, true),
            "pk_hashlock_delay" => ("pk", true, true),
            "csa" => ("csa", false, false),
            "csa_hashlock" => ("csa", true, false),
            "csa_delay" => ("csa", false, true),
            "csa_hashlock_delay" => ("csa", true, true),
            _ => {
                self.pos = family_start;
                return Err(self.error("unknown leaf family"));
            }
        };
        self.literal("(")?;

        let leaf = if base == "pk" {
            let key = self.x_only_key()?;
            let digest = if hashlock {
                self.comma()?;
                Some(self.digest()?)
            } else {
                None
            };
            let wait = if delay {
                self.comma()?;
                Some(self.integer()?)
            } else {
                None
            };
            match (digest, wait) {
                (None, None) => TapLeaf::pay_to_pubkey(&key),
                (Some(digest), None) => TapLeaf::pay_to_pubkey_hashlock(&key, digest),
                (None, Some(wait)) => TapLeaf::pay_to_pubkey_delay(&key, wait)?,
                (Some(digest), Some(wait)) => {
                    TapLeaf::pay_to_pubkey_hashlock_delay(&key, digest, wait)?
                }
            }
        } else {
            let k = self.integer()? as usize;
            let mut keys = Vec::new();
            // Keys run until the trailing digest/delay arguments, which
            // are distinguishable by length (64 hex vs 40 hex vs int).
            loop {
                let checkpoint = self.pos;
                if !self.consume(',') {
                    break;
                }
                if looks_like_key(self.rest()) {
                    keys.push(self.x_only_key()?);
                } else {
                    self.pos = checkpoint;
                    break;
                }
            }
            let digest = if hashlock {
                self.comma()?;
                Some(self.digest()?)
            } else {
                None
            };
            let wait = if delay {
                self.comma()?;
                Some(self.integer()?)
            } else {
                None
            };
            match (digest, wait) {
                (None, None) => TapLeaf::checksig_add(k, &keys)?,
                (Some(digest), None) => TapLeaf::checksig_add_hashlock(k, &keys, digest)?,
                (None, Some(wait)) => TapLeaf::checksig_add_delay(k, &keys, wait)?,
                (Some(digest), Some(wait)) => {
                    TapLeaf::checksig_add_hashlock_delay(k, &keys, digest, wait)?
                }
            }
        };

        self.literal("))")?;
        Ok(leaf)
    }
}

fn looks_like_key(rest: &str) -> bool {
    let end = rest.find([',', ')', ']']).unwrap_or(rest.len());
    end == 64 && rest[..end].bytes().all(|b| b.is_ascii_hexdigit())
}
