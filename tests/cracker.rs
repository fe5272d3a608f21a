use grille_crack::queue::create_portion_queue;
use grille_crack::queue::QueueKind;
use grille_crack::turning_grille::Grille;
use grille_crack::turning_grille::TurningGrilleCrackerImplDetails;
use grille_crack::turning_grille::TurningGrilleCrackerProducerConsumer;
use grille_crack::turning_grille::TurningGrilleCrackerSerial;
use grille_crack::turning_grille::TurningGrilleCrackerSyncless;
use grille_crack::turning_grille::WordsTrie;
use grille_crack::CrackerConfig;
use grille_crack::CrackerError;
use grille_crack::TurningGrilleCracker;

use std::collections::BTreeSet;
use std::sync::Arc;

const SIDE_LENGTH: usize = 4;
const CLEAR_TEXT: &str = "THEREDFOXRANAWAY";
const GRILLE_ORDINAL: u64 = 0b10_01_11_00;

/// Inverse of the cracker's decryption: writes the clear text through the
/// grille's holes under each rotation.
fn encrypt(clear_text: &str, grille: &Grille) -> String {
    let clear_text: Vec<char> = clear_text.chars().collect();
    assert_eq!(clear_text.len(), SIDE_LENGTH * SIDE_LENGTH);

    let mut cipher_text: Vec<char> = vec!['\0'; clear_text.len()];
    let mut next: usize = 0;
    for rotation in 0..4 {
        for y in 0..SIDE_LENGTH {
            for x in 0..SIDE_LENGTH {
                if grille.is_hole(x, y, rotation) {
                    cipher_text[y * SIDE_LENGTH + x] = clear_text[next];
                    next += 1;
                }
            }
        }
    }
    assert_eq!(next, clear_text.len());

    cipher_text.into_iter().collect()
}

fn brute_force_all_candidates(
    impl_details: Box<dyn TurningGrilleCrackerImplDetails>,
) -> BTreeSet<String> {
    let cipher_text: String = encrypt(CLEAR_TEXT, &Grille::new(SIDE_LENGTH / 2, GRILLE_ORDINAL));

    // An empty dictionary and a zero threshold collect every candidate.
    let words_trie: Arc<WordsTrie> = Arc::new(WordsTrie::from_words(Vec::<&str>::new()));
    let config: CrackerConfig = CrackerConfig {
        verbose: false,
        min_detected_word_count: 0,
    };

    let cracker: Arc<TurningGrilleCracker> = Arc::new(
        TurningGrilleCracker::new(&cipher_text, words_trie, config, impl_details).unwrap(),
    );

    // An Ok result also certifies that the processed count matched the
    // full ordinal space.
    cracker.brute_force().unwrap()
}

#[test]
fn serial_strategy_recovers_the_clear_text() {
    let candidates = brute_force_all_candidates(Box::new(TurningGrilleCrackerSerial::new()));
    assert!(candidates.contains(CLEAR_TEXT));
}

#[test]
fn syncless_strategy_recovers_the_clear_text() {
    let candidates = brute_force_all_candidates(Box::new(TurningGrilleCrackerSyncless::new()));
    assert!(candidates.contains(CLEAR_TEXT));
}

#[test]
fn producer_consumer_recovers_the_clear_text_with_every_backend() {
    for kind in [
        QueueKind::Blocking,
        QueueKind::Textbook,
        QueueKind::TextbookParkingLot,
        QueueKind::MostlyNonBlocking,
    ] {
        let portion_queue = create_portion_queue::<Grille>(kind, 2, 2);
        let candidates = brute_force_all_candidates(Box::new(
            TurningGrilleCrackerProducerConsumer::new(2, 2, portion_queue),
        ));
        assert!(candidates.contains(CLEAR_TEXT), "backend {:?}", kind);
    }
}

#[test]
fn reversed_candidates_are_scored_too() {
    let candidates = brute_force_all_candidates(Box::new(TurningGrilleCrackerSerial::new()));
    let reversed: String = CLEAR_TEXT.chars().rev().collect();
    assert!(candidates.contains(&reversed));
}

#[test]
fn only_scoring_candidates_are_reported() {
    let cipher_text: String = encrypt(CLEAR_TEXT, &Grille::new(SIDE_LENGTH / 2, GRILLE_ORDINAL));
    let words_trie: Arc<WordsTrie> = Arc::new(WordsTrie::from_words(["the", "red", "fox", "ran", "away"]));
    let config: CrackerConfig = CrackerConfig {
        verbose: false,
        min_detected_word_count: 5,
    };

    let cracker: Arc<TurningGrilleCracker> = Arc::new(
        TurningGrilleCracker::new(
            &cipher_text,
            words_trie,
            config,
            Box::new(TurningGrilleCrackerSerial::new()),
        )
        .unwrap(),
    );

    let candidates = cracker.brute_force().unwrap();
    assert!(candidates.contains(CLEAR_TEXT));
    // With a threshold of all 5 words, almost nothing else qualifies.
    assert!(candidates.len() < 16, "got {} candidates", candidates.len());
}

#[test]
fn rejects_a_ciphertext_with_non_letters() {
    let error = new_cracker_error("THEREDF0XRANAWAY");
    assert!(matches!(error, CrackerError::NonAlphabeticCipherText));
}

#[test]
fn rejects_a_ciphertext_of_the_wrong_length() {
    let error = new_cracker_error("ABC");
    assert!(matches!(error, CrackerError::InvalidCipherTextLength));
}

#[test]
fn rejects_a_square_ciphertext_with_an_odd_side() {
    let error = new_cracker_error("ABCDEFGHI");
    assert!(matches!(error, CrackerError::InvalidCipherTextLength));
}

fn new_cracker_error(cipher_text: &str) -> CrackerError {
    TurningGrilleCracker::new(
        cipher_text,
        Arc::new(WordsTrie::from_words(Vec::<&str>::new())),
        CrackerConfig::default(),
        Box::new(TurningGrilleCrackerSerial::new()),
    )
    .err()
    .unwrap()
}
