//! Change detection queries.
//!
//! Every query takes the checkpoint as `$1`, only returns rows whose driving
//! table changed strictly after it, and orders by the driving timestamp and
//! then the root id. The `updated_at` column is always the driving table's
//! timestamp.

macro_rules! film_work_columns {
    ($driver:literal) => {
        concat!(
            "
select
    fw.id,
    fw.title,
    fw.description,
    fw.rating,
    fw.type,
    max(",
            $driver,
            ".updated_at) as updated_at,
    coalesce(
        json_agg(
            distinct jsonb_build_object(
                'person_role', pfw.role,
                'person_id', p.id,
                'person_name', p.full_name
            )
        ) filter (where p.id is not null),
        '[]'
    ) as persons,
    array_remove(array_agg(distinct g.name), null) as genres
"
        )
    };
}

/// Films changed since the checkpoint.
pub const MOVIES_BY_FILM_WORK: &str = concat!(
    film_work_columns!("fw"),
    "from content.film_work fw
left join content.person_film_work pfw on pfw.film_work_id = fw.id
left join content.person p on p.id = pfw.person_id
left join content.genre_film_work gfw on gfw.film_work_id = fw.id
left join content.genre g on g.id = gfw.genre_id
where fw.updated_at > $1
group by fw.id
order by max(fw.updated_at), fw.id
"
);

/// Films of persons changed since the checkpoint.
pub const MOVIES_BY_PERSON: &str = concat!(
    film_work_columns!("changed"),
    "from content.person changed
join content.person_film_work changed_pfw on changed_pfw.person_id = changed.id
join content.film_work fw on fw.id = changed_pfw.film_work_id
left join content.person_film_work pfw on pfw.film_work_id = fw.id
left join content.person p on p.id = pfw.person_id
left join content.genre_film_work gfw on gfw.film_work_id = fw.id
left join content.genre g on g.id = gfw.genre_id
where changed.updated_at > $1
group by fw.id
order by max(changed.updated_at), fw.id
"
);

/// Films of genres changed since the checkpoint.
pub const MOVIES_BY_GENRE: &str = concat!(
    film_work_columns!("changed"),
    "from content.genre changed
join content.genre_film_work changed_gfw on changed_gfw.genre_id = changed.id
join content.film_work fw on fw.id = changed_gfw.film_work_id
left join content.person_film_work pfw on pfw.film_work_id = fw.id
left join content.person p on p.id = pfw.person_id
left join content.genre_film_work gfw on gfw.film_work_id = fw.id
left join content.genre g on g.id = gfw.genre_id
where changed.updated_at > $1
group by fw.id
order by max(changed.updated_at), fw.id
"
);

/// Genres changed since the checkpoint.
pub const GENRES: &str = "
select
    g.id,
    g.name,
    g.description,
    g.updated_at
from content.genre g
where g.updated_at > $1
order by g.updated_at, g.id
";

/// Persons changed since the checkpoint, with their film credits.
pub const PERSONS: &str = "
select
    p.id,
    p.full_name,
    p.updated_at,
    coalesce(
        json_agg(
            json_build_object('id', pfw.film_work_id, 'role', pfw.role)
            order by pfw.film_work_id, pfw.role
        ) filter (where pfw.film_work_id is not null),
        '[]'
    ) as films
from content.person p
left join content.person_film_work pfw on pfw.person_id = p.id
where p.updated_at > $1
group by p.id
order by p.updated_at, p.id
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_bind_checkpoint_with_exclusive_bound() {
        for query in [MOVIES_BY_FILM_WORK, MOVIES_BY_PERSON, MOVIES_BY_GENRE, GENRES, PERSONS] {
            assert!(query.contains("updated_at > $1"), "{}", query);
            assert!(!query.contains("$2"));
        }
    }

    #[test]
    fn test_movie_queries_order_by_driving_timestamp() {
        assert!(MOVIES_BY_FILM_WORK.contains("max(fw.updated_at) as updated_at"));
        assert!(MOVIES_BY_PERSON.contains("max(changed.updated_at) as updated_at"));
        assert!(MOVIES_BY_PERSON.contains("order by max(changed.updated_at), fw.id"));
        assert!(MOVIES_BY_GENRE.contains("order by max(changed.updated_at), fw.id"));
    }

    #[test]
    fn test_person_and_genre_drivers_skip_filmless_rows() {
        assert!(MOVIES_BY_PERSON
            .contains("join content.film_work fw on fw.id = changed_pfw.film_work_id"));
        assert!(!MOVIES_BY_PERSON.contains("left join content.film_work"));
        assert!(!MOVIES_BY_GENRE.contains("left join content.film_work"));
    }
}
