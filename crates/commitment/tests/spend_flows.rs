//! End-to-end flows: fixed commitment vectors, script-path spending,
//! and multi-party key-path spending.

use rand::thread_rng;

use tapforge_curve::{
    musig::{aggregate_nonces, aggregate_partials, KeyAggContext},
    schnorr,
    tagged::{hash160, sha256},
    KeyPair, PrivateKey, PublicKey, Scalar,
};

use tapforge_commitment::{
    address::{p2tr_address, Network},
    descriptor::parse_tree,
    leaf::TapLeaf,
    sighash::{taproot_signature_hash, OutPoint, SighashType, Transaction, TxIn, TxOut},
    tree::{Node, TapTree},
    tweak::{tap_tweak, tweaked_keypair, OutputKey},
    witness::{encode_signature, key_path_witness, script_path_witness},
};

fn secret(byte: u8) -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = byte;
    PrivateKey::from_bytes(&bytes).unwrap()
}

fn funding_tx(output_script: Vec<u8>, sequence: u32) -> (Transaction, Vec<TxOut>) {
    let mut txid = [0u8; 32];
    for (i, byte) in txid.iter_mut().enumerate() {
        *byte = i as u8;
    }
    let tx = Transaction {
        version: 2,
        lock_time: 0,
        inputs: vec![TxIn {
            prevout: OutPoint { txid, vout: 0 },
            sequence,
        }],
        outputs: vec![TxOut {
            value: 49_000,
            script_pubkey: output_script.clone(),
        }],
    };
    let prevouts = vec![TxOut {
        value: 50_000,
        script_pubkey: output_script,
    }];
    (tx, prevouts)
}

#[test]
fn three_leaf_tree_reproduces_fixed_vectors() {
    let leaves: Vec<TapLeaf> = [11u8, 12, 13]
        .iter()
        .map(|&byte| TapLeaf::pay_to_pubkey(&secret(byte).public_key()))
        .collect();
    assert_eq!(
        hex::encode(leaves[0].leaf_hash()),
        "4e2ca760a3dd8792f5ba13847e0cdf82139a16548cc740aada0265ccbadd6860"
    );
    assert_eq!(
        hex::encode(leaves[1].leaf_hash()),
        "d86e4532d37b0ad7703716256cf11069f4317a1f4406ac3380738e5e8c2348bf"
    );
    assert_eq!(
        hex::encode(leaves[2].leaf_hash()),
        "e27eaab2a98fba5034ab1998f9300cc48c9869cb6b0cd9fc761b7dd7e6ab4da7"
    );

    let internal = KeyPair::new(secret(21)).normalized().0;
    assert_eq!(
        hex::encode(internal.public_key().x_only()),
        "352bbf4a4cdd12564f93fa332ce333301d9ad40271f8107181340aef25be59d5"
    );

    let tree = TapTree::new(
        internal.public_key().clone(),
        Node::branch(
            Node::branch(
                Node::Leaf(leaves[0].clone()),
                Node::Leaf(leaves[1].clone()),
            ),
            Node::Leaf(leaves[2].clone()),
        ),
    );
    let info = tree.construct().unwrap();

    assert_eq!(
        hex::encode(info.tweak().to_bytes()),
        "8e56719e82802aa3c7a55b977ffd09d453f13b996db7df931cf9ebe54170afa3"
    );
    assert_eq!(
        hex::encode(info.output_key().x_only()),
        "7a6686cc8a59717ca0dbf870c7b70cda0616340919d15b722ba758a19a877f4c"
    );
    assert_eq!(info.output_key().parity(), 1);
    assert_eq!(
        p2tr_address(Network::Regtest, &info.output_key().x_only()).unwrap(),
        "bcrt1p0fngdny2t9chegxmlpcv0dcvmgrpvdqfr8g4ku3t5av2rx580axqxczfec"
    );

    let block = info.control_block(leaves[0].script()).unwrap();
    let bytes = block.serialize();
    assert_eq!(bytes.len(), 97);
    assert_eq!(
        hex::encode(&bytes),
        "c1352bbf4a4cdd12564f93fa332ce333301d9ad40271f8107181340aef25be59d5\
         d86e4532d37b0ad7703716256cf11069f4317a1f4406ac3380738e5e8c2348bf\
         e27eaab2a98fba5034ab1998f9300cc48c9869cb6b0cd9fc761b7dd7e6ab4da7"
    );
    block
        .verify(leaves[0].script(), &info.output_key().x_only())
        .unwrap();

    // With no script paths the tweak hash covers the key alone.
    assert_eq!(
        hex::encode(tap_tweak(&internal.public_key().x_only(), None).to_bytes()),
        "4b510ac6764d583ab848648ba2bf474784626a2db6e0884f9cc31bade8c93f2e"
    );
}

#[test]
fn key_path_output_reproduces_fixed_address() {
    let secret_bytes: [u8; 32] =
        hex::decode("e1c5199e744291eaafa9b59198c62db3230ba9f5f130e12f89dbe55236505974")
            .unwrap()
            .try_into()
            .unwrap();
    let internal = KeyPair::new(PrivateKey::from_bytes(&secret_bytes).unwrap())
        .normalized()
        .0;
    assert_eq!(
        hex::encode(internal.public_key().x_only()),
        "59ebc31fb79e7f8c608abe4a4dbf355d913f075a6e8dddb548b102a360ad605d"
    );

    let tweak_bytes: [u8; 32] =
        hex::decode("2a2fb476ec9962f262ff358800db0e7364287340db73e5e48db36d1c9f374e30")
            .unwrap()
            .try_into()
            .unwrap();
    let tweak = Scalar::from_bytes(&tweak_bytes);
    let output = OutputKey::from_internal(internal.public_key(), &tweak).unwrap();
    assert_eq!(
        p2tr_address(Network::Regtest, &output.x_only()).unwrap(),
        "bcrt1pjnux0f7037ysqv2aycfntus0t606sjyu0qe2xqewlmhulpdujqeq2z4st9"
    );

    // The tweaked keypair signs for the output key.
    let signer = tweaked_keypair(&internal, &tweak).unwrap();
    let msg = sha256(b"key path spend");
    let sig = schnorr::sign(&signer, &msg, None).unwrap();
    schnorr::verify(&sig, &output.x_only(), &msg).unwrap();
}

#[test]
fn script_path_spend_assembles_and_verifies() {
    let mut rng = thread_rng();
    let internal = KeyPair::generate_bip340(&mut rng);
    let alice = KeyPair::generate_bip340(&mut rng);
    let bob = KeyPair::generate_bip340(&mut rng);

    let preimage = sha256(b"secret");
    let digest = hash160(&preimage);
    let delay = 20;
    let leaf = TapLeaf::checksig_add_hashlock_delay(
        2,
        &[alice.public_key().clone(), bob.public_key().clone()],
        digest,
        delay,
    )
    .unwrap();

    let tree = TapTree::new(internal.public_key().clone(), Node::Leaf(leaf.clone()));
    let info = tree.construct().unwrap();
    let (tx, prevouts) = funding_tx(info.output_script(), delay);

    let digest32 = taproot_signature_hash(
        &tx,
        &prevouts,
        0,
        SighashType::DEFAULT,
        Some(&leaf.leaf_hash()),
    )
    .unwrap();

    let sig_alice = schnorr::sign(&alice, &digest32, None).unwrap();
    let sig_bob = schnorr::sign(&bob, &digest32, None).unwrap();
    schnorr::verify(&sig_alice, &alice.public_key().x_only(), &digest32).unwrap();
    schnorr::verify(&sig_bob, &bob.public_key().x_only(), &digest32).unwrap();

    // Template order: preimage, then signatures for the last key first.
    let block = info.control_block(leaf.script()).unwrap();
    let stack = script_path_witness(
        &leaf,
        vec![
            preimage.to_vec(),
            encode_signature(&sig_bob, SighashType::DEFAULT),
            encode_signature(&sig_alice, SighashType::DEFAULT),
        ],
        block,
        tx.version,
        tx.inputs[0].sequence,
    )
    .unwrap();
    assert_eq!(stack.len(), 5);
    assert_eq!(stack[3], leaf.script());
    assert_eq!(stack[4], block.serialize());
    block
        .verify(leaf.script(), &info.output_key().x_only())
        .unwrap();

    // Same spend one block early fails.
    assert!(script_path_witness(&leaf, vec![], block, tx.version, delay - 1).is_err());
}

#[test]
fn musig_key_path_spend_verifies_under_output_key() {
    let mut rng = thread_rng();
    let alice = KeyPair::generate_bip340(&mut rng);
    let bob = KeyPair::generate_bip340(&mut rng);
    let ctx = KeyAggContext::new(vec![
        alice.public_key().clone(),
        bob.public_key().clone(),
    ])
    .unwrap();

    let tree = TapTree::key_path_only(ctx.aggregated_pubkey().clone());
    let info = tree.construct().unwrap();
    let tweaked = ctx.with_tweak(info.tweak().clone()).unwrap();
    assert_eq!(
        tweaked.aggregated_pubkey().x_only(),
        info.output_key().x_only()
    );

    let (tx, prevouts) = funding_tx(info.output_script(), 0);
    let digest = taproot_signature_hash(&tx, &prevouts, 0, SighashType::DEFAULT, None).unwrap();

    let nonce_alice = KeyPair::generate(&mut rng);
    let nonce_bob = KeyPair::generate(&mut rng);
    let (agg_nonce, nonce_negated) = aggregate_nonces(&[
        nonce_alice.public_key().clone(),
        nonce_bob.public_key().clone(),
    ])
    .unwrap();
    let nonce_x = agg_nonce.x_only();
    let e = tweaked.challenge(&nonce_x, &digest);

    let partials = [
        tweaked
            .partial_sign(
                alice.secret_key(),
                nonce_alice.secret_key().scalar(),
                nonce_negated,
                &e,
            )
            .unwrap(),
        tweaked
            .partial_sign(
                bob.secret_key(),
                nonce_bob.secret_key().scalar(),
                nonce_negated,
                &e,
            )
            .unwrap(),
    ];
    let sig = aggregate_partials(&partials, nonce_x, tweaked.tweak_term(&e).as_ref());
    schnorr::verify(&sig, &info.output_key().x_only(), &digest).unwrap();

    let witness = key_path_witness(&sig, SighashType::DEFAULT);
    assert_eq!(witness.len(), 1);
    assert_eq!(witness[0].len(), 64);
}

#[test]
fn optimized_tree_descriptor_round_trips() {
    let mut rng = thread_rng();
    let internal = KeyPair::generate_bip340(&mut rng);
    let keys: Vec<PublicKey> = (0..3)
        .map(|_| KeyPair::generate_bip340(&mut rng).public_key().clone())
        .collect();

    let weighted = vec![
        (4, TapLeaf::pay_to_pubkey(&keys[0])),
        (2, TapLeaf::checksig_add(2, &keys).unwrap()),
        (
            1,
            TapLeaf::pay_to_pubkey_hashlock(&keys[1], hash160(&sha256(b"swap"))),
        ),
        (1, TapLeaf::pay_to_pubkey_delay(&keys[2], 144).unwrap()),
    ];

    let tree = TapTree::from_weighted_leaves(internal.public_key().clone(), weighted).unwrap();
    let descriptor = tree.descriptor();
    let parsed = parse_tree(&descriptor).unwrap();
    assert_eq!(parsed.descriptor(), descriptor);
    assert_eq!(
        parsed.construct().unwrap().output_key().x_only(),
        tree.construct().unwrap().output_key().x_only()
    );
}
