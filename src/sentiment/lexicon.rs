//! Fixed AFINN-style polarity lexicon. Values range -5..=5.
//!
//! The table is a frozen input to the scorer: changing an entry changes
//! published scores, so additions go through the same review as a schema
//! change.

pub(crate) static LEXICON: &[(&str, i8)] = &[
    ("abandon", -2),
    ("abandoned", -2),
    ("accident", -2),
    ("accomplish", 2),
    ("accomplished", 2),
    ("achieve", 2),
    ("achieved", 2),
    ("advance", 2),
    ("advances", 2),
    ("alarm", -2),
    ("alarming", -3),
    ("anger", -3),
    ("angry", -3),
    ("anxious", -2),
    ("applaud", 2),
    ("approval", 2),
    ("approve", 2),
    ("attack", -2),
    ("attacked", -2),
    ("award", 3),
    ("awarded", 3),
    ("awful", -3),
    ("bad", -3),
    ("bankrupt", -3),
    ("bankruptcy", -3),
    ("benefit", 2),
    ("benefits", 2),
    ("best", 3),
    ("better", 2),
    ("blame", -2),
    ("blamed", -2),
    ("boom", 3),
    ("boost", 2),
    ("boosted", 2),
    ("breakthrough", 3),
    ("bright", 2),
    ("brilliant", 4),
    ("broken", -2),
    ("calm", 1),
    ("cancel", -1),
    ("cancelled", -1),
    ("catastrophe", -4),
    ("catastrophic", -4),
    ("celebrate", 3),
    ("celebrated", 3),
    ("challenge", -1),
    ("chaos", -3),
    ("cheer", 2),
    ("collapse", -3),
    ("collapsed", -3),
    ("concern", -2),
    ("concerned", -2),
    ("concerns", -2),
    ("confident", 2),
    ("conflict", -2),
    ("crash", -3),
    ("crashed", -3),
    ("crisis", -3),
    ("cut", -1),
    ("cuts", -1),
    ("damage", -3),
    ("damaged", -3),
    ("danger", -2),
    ("dangerous", -2),
    ("dead", -3),
    ("deadlock", -2),
    ("death", -2),
    ("decline", -2),
    ("declined", -2),
    ("defeat", -2),
    ("deficit", -2),
    ("delay", -1),
    ("delayed", -1),
    ("destroy", -3),
    ("destroyed", -3),
    ("disaster", -3),
    ("disastrous", -3),
    ("dismal", -3),
    ("disrupt", -2),
    ("disruption", -2),
    ("doubt", -1),
    ("doubts", -1),
    ("downturn", -3),
    ("drop", -1),
    ("dropped", -1),
    ("effective", 2),
    ("efficient", 2),
    ("embarrassing", -2),
    ("emergency", -2),
    ("excellent", 3),
    ("exciting", 3),
    ("expand", 2),
    ("expansion", 2),
    ("fail", -2),
    ("failed", -2),
    ("failure", -2),
    ("fake", -3),
    ("fall", -1),
    ("falling", -1),
    ("fear", -2),
    ("fears", -2),
    ("fine", 2),
    ("fraud", -4),
    ("gain", 2),
    ("gains", 2),
    ("good", 3),
    ("great", 3),
    ("grow", 2),
    ("growing", 2),
    ("growth", 2),
    ("happy", 3),
    ("hope", 2),
    ("hopeful", 2),
    ("improve", 2),
    ("improved", 2),
    ("improvement", 2),
    ("innovative", 2),
    ("jeopardy", -2),
    ("kill", -3),
    ("killed", -3),
    ("launch", 1),
    ("launched", 1),
    ("layoff", -2),
    ("layoffs", -2),
    ("lose", -3),
    ("loss", -3),
    ("losses", -3),
    ("lost", -3),
    ("lucky", 3),
    ("optimism", 2),
    ("optimistic", 2),
    ("outstanding", 5),
    ("panic", -3),
    ("plummet", -3),
    ("plummeted", -3),
    ("plunge", -3),
    ("plunged", -3),
    ("popular", 3),
    ("positive", 2),
    ("praise", 3),
    ("praised", 3),
    ("problem", -2),
    ("problems", -2),
    ("profit", 2),
    ("profits", 2),
    ("progress", 2),
    ("promising", 2),
    ("prosperity", 3),
    ("protest", -2),
    ("protests", -2),
    ("rally", 2),
    ("rallied", 2),
    ("ruin", -3),
    ("ruined", -3),
    ("rise", 1),
    ("rising", 1),
    ("risk", -2),
    ("risks", -2),
    ("robust", 2),
    ("scandal", -3),
    ("severe", -2),
    ("slump", -3),
    ("slumped", -3),
    ("soar", 3),
    ("soared", 3),
    ("solid", 2),
    ("steady", 1),
    ("stable", 1),
    ("strength", 2),
    ("strong", 2),
    ("struggle", -2),
    ("struggling", -2),
    ("success", 2),
    ("successful", 3),
    ("support", 2),
    ("surge", 2),
    ("surged", 2),
    ("threat", -2),
    ("threats", -2),
    ("tragedy", -2),
    ("tragic", -2),
    ("trouble", -2),
    ("troubled", -2),
    ("turmoil", -3),
    ("uncertain", -1),
    ("uncertainty", -1),
    ("upbeat", 2),
    ("victory", 3),
    ("violence", -3),
    ("violent", -3),
    ("warn", -2),
    ("warned", -2),
    ("warning", -3),
    ("weak", -2),
    ("weakness", -2),
    ("welcome", 2),
    ("win", 4),
    ("winner", 4),
    ("wins", 4),
    ("worries", -3),
    ("worry", -3),
    ("worrying", -3),
    ("worse", -3),
    ("worst", -3),
    ("wrong", -2),
];
